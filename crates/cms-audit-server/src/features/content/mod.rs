//! Generic content API
//!
//! Create, read, update and delete entities of any content type through the
//! [`EntityService`](crate::host::EntityService), so HTTP mutations fire the
//! host lifecycles and get audited.

pub mod routes;


pub use routes::content_routes;
