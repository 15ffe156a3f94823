//! Ambient per-request context
//!
//! [`RequestContextLayer`] authenticates each request and runs the rest of the
//! stack inside a tokio task-local holding the [`RequestContext`]. Code running
//! on that task, lifecycle hooks included, reads it with [`current`]. Tasks
//! spawned elsewhere see no context.

use axum::{extract::Request, response::Response};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthUser, Authenticator};

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// What hooks know about the request that triggered them
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub user: Option<AuthUser>,
}

impl RequestContext {
    pub fn new(user: Option<AuthUser>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user,
        }
    }
}

/// Context of the request being served on this task, if any
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

/// Run `fut` with `context` as the ambient request context
pub async fn scope<F: Future>(context: RequestContext, fut: F) -> F::Output {
    REQUEST_CONTEXT.scope(context, fut).await
}

/// Layer establishing the request context
#[derive(Clone)]
pub struct RequestContextLayer {
    authenticator: Arc<dyn Authenticator>,
}

impl RequestContextLayer {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextMiddleware {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

/// Request context middleware service
#[derive(Clone)]
pub struct RequestContextMiddleware<S> {
    inner: S,
    authenticator: Arc<dyn Authenticator>,
}

impl<S> Service<Request> for RequestContextMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            let user = match authenticator.authenticate(request.headers()).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(
                        uri = %request.uri(),
                        error = %e,
                        "Failed to authenticate request, continuing anonymously"
                    );
                    None
                },
            };

            let context = RequestContext::new(user);
            debug!(
                request_id = %context.request_id,
                user_id = ?context.user.as_ref().map(|u| u.id),
                "Request context established"
            );

            request.extensions_mut().insert(context.clone());
            scope(context, inner.call(request)).await
        })
    }
}
