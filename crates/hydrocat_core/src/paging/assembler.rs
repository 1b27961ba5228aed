//! Keyset-paged catalog assembly.
//!
//! # Responsibility
//! - Turn filters + optional cursor + page size into one page of grouped
//!   catalog entities and a resumable next cursor.
//! - Keep the only continuation state inside the cursor.
//!
//! # Invariants
//! - Page size is validated before any query is issued.
//! - A malformed cursor is a client error; there is no fallback to page 1.
//! - Count and scan failures surface as `Retrieval` without retries.
//! - The total is counted once per traversal and then carried by cursors.
//!
//! # Consistency
//! The cached total is not re-verified on later pages. If rows are added or
//! removed mid-traversal the final page may advertise a next page that turns
//! out empty, or stop before newly inserted rows. This staleness window is
//! accepted to avoid a full re-count per page.

use crate::paging::cursor::{self, CursorError};
use crate::paging::fold::{fold_rows, FlatRow, SortKey};
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::Instant;

/// Entity type produced by a catalog source.
pub type EntityOf<S> = <<S as CatalogSource>::Row as FlatRow>::Entity;
/// Parent key type of a catalog source.
pub type KeyOf<S> = <<S as CatalogSource>::Row as FlatRow>::Key;

pub type PageResult<T> = Result<T, PageError>;

/// Query executor capabilities required by [`fetch_page`].
///
/// Implementations must order `scan` rows by the parent sort key ascending
/// and return every row of each parent they include; `limit` bounds the
/// number of distinct parents.
pub trait CatalogSource {
    type Filter: Debug;
    type Row: FlatRow;

    /// Short catalog name used in logs and error context.
    fn catalog_name(&self) -> &'static str;

    /// Counts parents matching `filter`, ignoring any seek position.
    fn count(&self, filter: &Self::Filter) -> RepoResult<u64>;

    /// Returns rows of at most `limit` parents strictly after `seek_after`.
    fn scan(
        &self,
        filter: &Self::Filter,
        seek_after: Option<&KeyOf<Self>>,
        limit: u32,
    ) -> RepoResult<Vec<Self::Row>>;
}

/// One page of grouped catalog entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    /// Parents matching the filters when the traversal started.
    pub total: u64,
    /// Number of items actually returned on this page.
    pub page_size: u32,
    /// Opaque token for the following page; `None` on the terminal page.
    pub next_page: Option<String>,
}

impl<T> PageResponse<T> {
    fn empty(total: u64) -> Self {
        Self {
            items: Vec::new(),
            total,
            page_size: 0,
            next_page: None,
        }
    }
}

/// Which executor call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    Count,
    Scan,
}

impl Display for RetrievalStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Scan => write!(f, "scan"),
        }
    }
}

/// Errors returned by [`fetch_page`].
#[derive(Debug)]
pub enum PageError {
    /// Page size was zero or negative.
    InvalidPageSize(i64),
    /// Cursor could not be decoded into a position for this catalog.
    MalformedCursor(CursorError),
    /// Query executor failed; carries the filters that were in effect.
    Retrieval {
        catalog: &'static str,
        stage: RetrievalStage,
        context: String,
        source: RepoError,
    },
}

impl Display for PageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize(value) => {
                write!(f, "page size must be greater than zero, got {value}")
            }
            Self::MalformedCursor(err) => write!(f, "malformed cursor: {err}"),
            Self::Retrieval {
                catalog,
                stage,
                context,
                source,
            } => write!(
                f,
                "{catalog} {stage} failed for filters {context}: {source}"
            ),
        }
    }
}

impl Error for PageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPageSize(_) => None,
            Self::MalformedCursor(err) => Some(err),
            Self::Retrieval { source, .. } => Some(source),
        }
    }
}

impl From<CursorError> for PageError {
    fn from(value: CursorError) -> Self {
        Self::MalformedCursor(value)
    }
}

/// Resume point carried by cursors: last parent key plus parents served.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResumePoint<K> {
    key: K,
    served: u64,
}

impl<K: SortKey> ResumePoint<K> {
    fn to_parts(&self) -> Vec<String> {
        let mut parts = self.key.to_parts();
        parts.push(self.served.to_string());
        parts
    }

    fn from_parts(parts: &[String]) -> Result<Self, CursorError> {
        let (served, key_parts) = parts
            .split_last()
            .ok_or_else(|| CursorError::InvalidPosition("no position parts".to_string()))?;
        let served = served.parse::<u64>().map_err(|_| {
            CursorError::InvalidPosition(format!("served count `{served}` is not a count"))
        })?;
        let key = K::from_parts(key_parts).ok_or_else(|| {
            CursorError::InvalidPosition(format!(
                "{} key parts do not form a sort key",
                key_parts.len()
            ))
        })?;
        Ok(Self { key, served })
    }
}

/// Fetches one page of grouped entities from `source`.
///
/// `cursor` must be `None` for the first page; empty strings are the
/// caller's concern and are not accepted here as "no cursor".
///
/// # Errors
/// - [`PageError::InvalidPageSize`] when `page_size <= 0`; no query runs.
/// - [`PageError::MalformedCursor`] when `cursor` cannot be decoded.
/// - [`PageError::Retrieval`] when the count or scan query fails.
pub fn fetch_page<S: CatalogSource>(
    source: &S,
    filter: &S::Filter,
    cursor: Option<&str>,
    page_size: i64,
) -> PageResult<PageResponse<EntityOf<S>>> {
    let catalog = source.catalog_name();
    if page_size <= 0 {
        debug!("event=catalog_page module=paging status=rejected catalog={catalog} reason=page_size value={page_size}");
        return Err(PageError::InvalidPageSize(page_size));
    }
    let limit = u32::try_from(page_size).unwrap_or(u32::MAX);

    let started_at = Instant::now();
    let (resume, cached_total) = match cursor {
        Some(token) => decode_resume_point::<KeyOf<S>>(token).map_err(|err| {
            debug!("event=catalog_page module=paging status=rejected catalog={catalog} reason=cursor cursor_len={}", token.len());
            err
        })?,
        None => (None, None),
    };

    let total = match cached_total {
        Some(total) => total,
        None => source
            .count(filter)
            .map_err(|err| retrieval_error(catalog, RetrievalStage::Count, filter, err))?,
    };

    if total == 0 {
        info!(
            "event=catalog_page module=paging status=ok catalog={catalog} rows=0 total=0 duration_ms={}",
            started_at.elapsed().as_millis()
        );
        return Ok(PageResponse::empty(0));
    }

    let rows = source
        .scan(filter, resume.as_ref().map(|point| &point.key), limit)
        .map_err(|err| retrieval_error(catalog, RetrievalStage::Scan, filter, err))?;

    let Some(last_key) = rows.last().map(FlatRow::parent_key) else {
        info!(
            "event=catalog_page module=paging status=ok catalog={catalog} rows=0 total={total} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        return Ok(PageResponse::empty(total));
    };

    let row_count = rows.len();
    let items = fold_rows(rows);
    let returned = items.len() as u64;
    let served = resume.map_or(0, |point| point.served) + returned;

    let next_page = if served >= total {
        None
    } else {
        let point = ResumePoint {
            key: last_key,
            served,
        };
        Some(cursor::encode(&point.to_parts(), total))
    };

    info!(
        "event=catalog_page module=paging status=ok catalog={catalog} rows={row_count} items={returned} total={total} has_next={} duration_ms={}",
        next_page.is_some(),
        started_at.elapsed().as_millis()
    );

    Ok(PageResponse {
        items,
        total,
        page_size: u32::try_from(returned).unwrap_or(u32::MAX),
        next_page,
    })
}

fn decode_resume_point<K: SortKey>(
    token: &str,
) -> Result<(Option<ResumePoint<K>>, Option<u64>), CursorError> {
    let (parts, total) = cursor::decode(token)?.into_parts();
    let point = ResumePoint::from_parts(&parts)?;
    Ok((Some(point), total))
}

fn retrieval_error<F: Debug>(
    catalog: &'static str,
    stage: RetrievalStage,
    filter: &F,
    source: RepoError,
) -> PageError {
    error!(
        "event=catalog_page module=paging status=error catalog={catalog} stage={stage} error_code=retrieval_failed error={source}"
    );
    PageError::Retrieval {
        catalog,
        stage,
        context: format!("{filter:?}"),
        source,
    }
}
