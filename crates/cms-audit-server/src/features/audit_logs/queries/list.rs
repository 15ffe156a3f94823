use cms_audit_common::time::parse_instant;
use thiserror::Error;

use crate::audit::{
    AuditAction, AuditLogEntry, AuditLogFilter, AuditLogStore, AuditSort, PageRequest,
    UnknownAction, UnknownSortField, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::error::AppError;
use crate::features::shared::{ListResponse, PaginationMeta, QueryParams};
use crate::host::{EntityId, StoreResult};

pub const CONTENT_TYPE_PARAM: &str = "filters[contentType][$in]";
pub const USER_ID_PARAM: &str = "filters[userId]";
pub const ACTION_PARAM: &str = "filters[action][$in]";
pub const DATE_FROM_PARAM: &str = "filters[dateFrom]";
pub const DATE_TO_PARAM: &str = "filters[dateTo]";
pub const PAGE_PARAM: &str = "pagination[page]";
pub const PAGE_SIZE_PARAM: &str = "pagination[pageSize]";
pub const SORT_PARAM: &str = "sort";

/// A validated audit log listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadAuditLogsQuery {
    pub filter: AuditLogFilter,
    pub sort: AuditSort,
    pub page: PageRequest,
}

#[derive(Debug, Error)]
pub enum ReadQueryError {
    #[error("Invalid date in {param}: {value}")]
    InvalidDate { param: &'static str, value: String },

    #[error("{param} must be a positive integer, got {value}")]
    NotAnInteger { param: &'static str, value: String },

    #[error("Page must be greater than 0")]
    InvalidPage,

    #[error("Page size must be between 1 and {max}")]
    InvalidPageSize { max: u32 },

    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),

    #[error(transparent)]
    UnknownSortField(#[from] UnknownSortField),
}

impl From<ReadQueryError> for AppError {
    fn from(err: ReadQueryError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(
    params: &QueryParams,
    param: &'static str,
) -> Result<Option<T>, ReadQueryError> {
    params
        .get(param)
        .map(|value| {
            value.trim().parse().map_err(|_| ReadQueryError::NotAnInteger {
                param,
                value: value.to_string(),
            })
        })
        .transpose()
}

fn parse_date(
    params: &QueryParams,
    param: &'static str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, ReadQueryError> {
    params
        .get(param)
        .map(|value| {
            parse_instant(value).map_err(|_| ReadQueryError::InvalidDate {
                param,
                value: value.to_string(),
            })
        })
        .transpose()
}

impl ReadAuditLogsQuery {
    /// Parse and validate the query string of a read request
    ///
    /// Empty values are treated as absent.
    pub fn from_params(params: &QueryParams) -> Result<Self, ReadQueryError> {
        let actions = params
            .get_all(ACTION_PARAM)
            .iter()
            .map(|a| a.parse::<AuditAction>())
            .collect::<Result<Vec<_>, _>>()?;

        let filter = AuditLogFilter {
            content_types: params.get_all(CONTENT_TYPE_PARAM),
            user_id: parse_number::<EntityId>(params, USER_ID_PARAM)?,
            actions,
            date_from: parse_date(params, DATE_FROM_PARAM)?,
            date_to: parse_date(params, DATE_TO_PARAM)?,
        };

        let page = parse_number::<u32>(params, PAGE_PARAM)?.unwrap_or(1);
        if page < 1 {
            return Err(ReadQueryError::InvalidPage);
        }
        let page_size = parse_number::<u32>(params, PAGE_SIZE_PARAM)?.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ReadQueryError::InvalidPageSize { max: MAX_PAGE_SIZE });
        }

        let sort = params
            .get(SORT_PARAM)
            .map(AuditSort::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            filter,
            sort,
            page: PageRequest { page, page_size },
        })
    }
}

/// Run the listing and count concurrently
#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn AuditLogStore,
    query: ReadAuditLogsQuery,
) -> StoreResult<ListResponse<AuditLogEntry>> {
    let (data, total) = tokio::try_join!(
        store.find_many(&query.filter, query.sort, query.page),
        store.count(&query.filter),
    )?;

    Ok(ListResponse::new(
        data,
        PaginationMeta::new(query.page.page, query.page.page_size, total),
    ))
}
