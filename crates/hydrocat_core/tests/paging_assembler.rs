use hydrocat_core::paging::cursor::{decode, encode_position};
use hydrocat_core::paging::{
    fetch_page, CatalogSource, FlatRow, GroupedEntity, KeyOf, PageError, RetrievalStage, SortKey,
};
use hydrocat_core::{RepoError, RepoResult};
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StationKey(u32);

impl SortKey for StationKey {
    fn to_parts(&self) -> Vec<String> {
        vec![self.0.to_string()]
    }

    fn from_parts(parts: &[String]) -> Option<Self> {
        match parts {
            [code] => code.parse().ok().map(Self),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Station {
    code: u32,
    gauges: Vec<String>,
}

impl GroupedEntity for Station {
    type Child = String;

    fn push_child(&mut self, child: String) {
        self.gauges.push(child);
    }
}

#[derive(Debug, Clone)]
struct StationRow {
    code: u32,
    gauge: Option<&'static str>,
}

impl FlatRow for StationRow {
    type Key = StationKey;
    type Entity = Station;

    fn parent_key(&self) -> StationKey {
        StationKey(self.code)
    }

    fn parent(&self) -> Station {
        Station {
            code: self.code,
            gauges: Vec::new(),
        }
    }

    fn child(&self) -> Option<String> {
        self.gauge.map(str::to_string)
    }
}

#[derive(Debug, Clone, Default)]
struct StationFilter {
    basin: Option<&'static str>,
}

/// In-memory source that records every count/scan it serves.
#[derive(Default)]
struct RecordingSource {
    rows: Vec<StationRow>,
    count_override: Option<u64>,
    fail_count: bool,
    fail_scan: bool,
    queries: RefCell<Vec<String>>,
    scans: Cell<usize>,
}

impl RecordingSource {
    fn with_rows(rows: &[(u32, Option<&'static str>)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|&(code, gauge)| StationRow { code, gauge })
                .collect(),
            ..Self::default()
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl CatalogSource for RecordingSource {
    type Filter = StationFilter;
    type Row = StationRow;

    fn catalog_name(&self) -> &'static str {
        "stations"
    }

    fn count(&self, _filter: &StationFilter) -> RepoResult<u64> {
        self.queries.borrow_mut().push("count".to_string());
        if self.fail_count {
            return Err(RepoError::InvalidData("count exploded".to_string()));
        }
        let mut codes = self.rows.iter().map(|row| row.code).collect::<Vec<_>>();
        codes.dedup();
        Ok(self.count_override.unwrap_or(codes.len() as u64))
    }

    fn scan(
        &self,
        _filter: &StationFilter,
        seek_after: Option<&KeyOf<Self>>,
        limit: u32,
    ) -> RepoResult<Vec<StationRow>> {
        let after = seek_after.map(|key| key.0);
        self.queries
            .borrow_mut()
            .push(format!("scan after={after:?} limit={limit}"));
        self.scans.set(self.scans.get() + 1);
        if self.fail_scan {
            return Err(RepoError::InvalidData("scan exploded".to_string()));
        }

        let mut parents = Vec::new();
        let mut rows = Vec::new();
        for row in &self.rows {
            if after.is_some_and(|code| row.code <= code) {
                continue;
            }
            if !parents.contains(&row.code) {
                if parents.len() == limit as usize {
                    break;
                }
                parents.push(row.code);
            }
            rows.push(row.clone());
        }
        Ok(rows)
    }
}

fn sample_source() -> RecordingSource {
    RecordingSource::with_rows(&[
        (1, Some("stage")),
        (1, Some("flow")),
        (2, None),
        (3, Some("precip")),
        (4, Some("stage")),
        (5, Some("temp")),
    ])
}

#[test]
fn non_positive_page_size_is_rejected_before_any_query() {
    let source = sample_source();
    for page_size in [0, -5] {
        let err = fetch_page(&source, &StationFilter::default(), None, page_size).unwrap_err();
        assert!(matches!(err, PageError::InvalidPageSize(value) if value == page_size));
    }
    assert!(source.queries().is_empty());
}

#[test]
fn malformed_cursor_is_rejected_before_any_query() {
    let source = sample_source();
    for cursor in ["%%%", "abc", "6869"] {
        let err = fetch_page(&source, &StationFilter::default(), Some(cursor), 2).unwrap_err();
        assert!(matches!(err, PageError::MalformedCursor(_)), "cursor {cursor}");
    }
    assert!(source.queries().is_empty());
}

#[test]
fn first_page_counts_and_later_pages_reuse_the_total() {
    let source = sample_source();
    let filter = StationFilter::default();

    let first = fetch_page(&source, &filter, None, 2).unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.page_size, 2);
    assert_eq!(
        first.items,
        vec![
            Station {
                code: 1,
                gauges: vec!["stage".to_string(), "flow".to_string()],
            },
            Station {
                code: 2,
                gauges: Vec::new(),
            },
        ]
    );

    let second = fetch_page(&source, &filter, first.next_page.as_deref(), 2).unwrap();
    let third = fetch_page(&source, &filter, second.next_page.as_deref(), 2).unwrap();
    assert_eq!(third.items.len(), 1);
    assert_eq!(third.next_page, None);

    assert_eq!(
        source.queries(),
        vec![
            "count",
            "scan after=None limit=2",
            "scan after=Some(2) limit=2",
            "scan after=Some(4) limit=2",
        ]
    );
}

#[test]
fn next_cursor_carries_key_served_count_and_total() {
    let source = sample_source();
    let first = fetch_page(&source, &StationFilter::default(), None, 2).unwrap();

    let decoded = decode(first.next_page.as_deref().unwrap()).unwrap();
    assert_eq!(decoded.parts(), ["2".to_string(), "2".to_string()]);
    assert_eq!(decoded.total(), Some(5));
}

#[test]
fn position_only_cursor_triggers_a_recount() {
    let source = sample_source();
    let cursor = encode_position(&["3".to_string(), "3".to_string()]);

    let page = fetch_page(&source, &StationFilter::default(), Some(&cursor), 10).unwrap();
    assert_eq!(page.total, 5);
    let codes = page.items.iter().map(|s| s.code).collect::<Vec<_>>();
    assert_eq!(codes, vec![4, 5]);
    assert_eq!(page.next_page, None);
    assert_eq!(source.queries(), vec!["count", "scan after=Some(3) limit=10"]);
}

#[test]
fn zero_total_skips_the_scan() {
    let source = RecordingSource::default();
    let page = fetch_page(&source, &StationFilter::default(), None, 10).unwrap();

    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
    assert_eq!(page.next_page, None);
    assert_eq!(source.scans.get(), 0);
}

#[test]
fn stale_total_ends_with_an_empty_terminal_page() {
    let mut source = RecordingSource::with_rows(&[(1, Some("stage")), (2, Some("flow"))]);
    source.count_override = Some(4);
    let filter = StationFilter::default();

    let first = fetch_page(&source, &filter, None, 2).unwrap();
    assert_eq!(first.total, 4);
    assert!(first.next_page.is_some());

    let second = fetch_page(&source, &filter, first.next_page.as_deref(), 2).unwrap();
    assert!(second.items.is_empty());
    assert_eq!(second.total, 4);
    assert_eq!(second.page_size, 0);
    assert_eq!(second.next_page, None);
}

#[test]
fn count_failure_reports_stage_and_filters() {
    let mut source = sample_source();
    source.fail_count = true;
    let filter = StationFilter {
        basin: Some("Arkansas"),
    };

    let err = fetch_page(&source, &filter, None, 2).unwrap_err();
    match &err {
        PageError::Retrieval {
            catalog,
            stage,
            context,
            source: cause,
        } => {
            assert_eq!(*catalog, "stations");
            assert_eq!(*stage, RetrievalStage::Count);
            assert!(context.contains("Arkansas"));
            assert!(matches!(cause, RepoError::InvalidData(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("stations count failed"));
    assert_eq!(source.queries(), vec!["count"]);
}

#[test]
fn scan_failure_is_not_retried() {
    let mut source = sample_source();
    source.fail_scan = true;

    let err = fetch_page(&source, &StationFilter::default(), None, 2).unwrap_err();
    assert!(matches!(
        err,
        PageError::Retrieval {
            stage: RetrievalStage::Scan,
            ..
        }
    ));
    assert_eq!(source.scans.get(), 1);
}
