//! Time-series group catalog over SQLite.
//!
//! # Responsibility
//! - Page the category/group/assignment join as grouped `TimeSeriesGroup`s.
//! - Provide typed write helpers for categories, groups and assignments.
//!
//! # Invariants
//! - Catalog order is `category_code ASC, group_id ASC`; the pair is unique.
//! - Members within a group are ordered by `attribute ASC, ts_id ASC`.
//! - Page limits bound groups, never member rows, so a group is never split
//!   across pages.

use crate::model::ts_group::{AssignedTimeSeries, TimeSeriesCategory, TimeSeriesGroup};
use crate::paging::{CatalogSource, FlatRow, SortKey};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    ensure_tables_ready, limit_value, normalize_identifier, normalize_office, normalize_text,
    push_mask_filter, push_office_filter, TableSpec,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const REQUIRED_TABLES: &[TableSpec] = &[
    (
        "ts_categories",
        &["category_code", "office_id", "category_id", "description"],
    ),
    (
        "ts_groups",
        &[
            "group_code",
            "category_code",
            "office_id",
            "group_id",
            "description",
            "shared_alias_id",
            "shared_ref_ts_id",
        ],
    ),
    ("ts_identifiers", &["ts_code", "office_id", "ts_id"]),
    (
        "ts_group_assignments",
        &["group_code", "ts_code", "attribute", "alias_id", "ref_ts_id"],
    ),
];

const GROUP_FROM_SQL: &str = "FROM ts_groups g
    INNER JOIN ts_categories c ON c.category_code = g.category_code
    WHERE 1 = 1";

const PARENT_COLUMNS_SQL: &str = "SELECT
    c.category_code AS category_code,
    c.office_id AS category_office_id,
    c.category_id AS category_id,
    c.description AS category_description,
    g.office_id AS group_office_id,
    g.group_id AS group_id,
    g.description AS group_description,
    g.shared_alias_id AS shared_alias_id,
    g.shared_ref_ts_id AS shared_ref_ts_id";

/// Filters for the time-series group catalog.
///
/// Masks use `*`/`?` wildcards and match case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsGroupFilter {
    /// Office that owns the groups.
    pub office_id: Option<String>,
    pub category_id: Option<String>,
    pub group_id: Option<String>,
    /// Keeps only groups with at least one member matching this mask.
    pub time_series_id: Option<String>,
    /// When `false`, member lists are returned empty and not joined.
    pub include_assigned: bool,
}

impl Default for TsGroupFilter {
    fn default() -> Self {
        Self {
            office_id: None,
            category_id: None,
            group_id: None,
            time_series_id: None,
            include_assigned: true,
        }
    }
}

/// Catalog position of one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TsGroupKey {
    pub category_code: i64,
    pub group_id: String,
}

impl SortKey for TsGroupKey {
    fn to_parts(&self) -> Vec<String> {
        vec![self.category_code.to_string(), self.group_id.clone()]
    }

    fn from_parts(parts: &[String]) -> Option<Self> {
        let [category_code, group_id] = parts else {
            return None;
        };
        Some(Self {
            category_code: category_code.parse().ok()?,
            group_id: group_id.clone(),
        })
    }
}

/// One row of the group/member join.
#[derive(Debug, Clone, PartialEq)]
pub struct TsGroupRow {
    pub category_code: i64,
    pub category_office_id: String,
    pub category_id: String,
    pub category_description: Option<String>,
    pub group_office_id: String,
    pub group_id: String,
    pub group_description: Option<String>,
    pub shared_alias_id: Option<String>,
    pub shared_ref_ts_id: Option<String>,
    pub ts_office_id: Option<String>,
    pub ts_id: Option<String>,
    pub attribute: Option<f64>,
    pub alias_id: Option<String>,
    pub ref_ts_id: Option<String>,
}

impl FlatRow for TsGroupRow {
    type Key = TsGroupKey;
    type Entity = TimeSeriesGroup;

    fn parent_key(&self) -> TsGroupKey {
        TsGroupKey {
            category_code: self.category_code,
            group_id: self.group_id.clone(),
        }
    }

    fn parent(&self) -> TimeSeriesGroup {
        TimeSeriesGroup {
            office_id: self.group_office_id.clone(),
            time_series_category: TimeSeriesCategory {
                office_id: self.category_office_id.clone(),
                id: self.category_id.clone(),
                description: self.category_description.clone(),
            },
            id: self.group_id.clone(),
            description: self.group_description.clone(),
            shared_alias_id: self.shared_alias_id.clone(),
            shared_ref_ts_id: self.shared_ref_ts_id.clone(),
            assigned_time_series: Vec::new(),
        }
    }

    fn child(&self) -> Option<AssignedTimeSeries> {
        let (Some(office_id), Some(ts_id)) = (&self.ts_office_id, &self.ts_id) else {
            return None;
        };
        Some(AssignedTimeSeries {
            office_id: office_id.clone(),
            timeseries_id: ts_id.clone(),
            attribute: self.attribute,
            alias_id: self.alias_id.clone(),
            ref_ts_id: self.ref_ts_id.clone(),
        })
    }
}

/// Input for [`SqliteTsGroupCatalog::create_group`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTsGroup {
    pub category_code: i64,
    pub group_id: String,
    pub description: Option<String>,
    pub shared_alias_id: Option<String>,
    pub shared_ref_ts_id: Option<String>,
}

/// Input for [`SqliteTsGroupCatalog::assign_time_series`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAssignment {
    pub group_code: i64,
    pub ts_code: i64,
    pub attribute: Option<f64>,
    pub alias_id: Option<String>,
    pub ref_ts_id: Option<String>,
}

/// SQLite-backed time-series group catalog.
pub struct SqliteTsGroupCatalog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTsGroupCatalog<'conn> {
    /// Creates the catalog from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    /// Creates one category and returns its code.
    pub fn create_category(
        &self,
        office_id: &str,
        category_id: &str,
        description: Option<&str>,
    ) -> RepoResult<i64> {
        let office_id = normalize_office(office_id)?;
        let category_id = normalize_identifier("category_id", category_id)?;
        self.conn.execute(
            "INSERT INTO ts_categories (office_id, category_id, description)
             VALUES (?1, ?2, ?3);",
            params![office_id, category_id, normalize_text(description)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Creates one group inside an existing category and returns its code.
    ///
    /// The group inherits the category's office.
    pub fn create_group(&self, group: &NewTsGroup) -> RepoResult<i64> {
        let group_id = normalize_identifier("group_id", &group.group_id)?;
        let changed = self.conn.execute(
            "INSERT INTO ts_groups (
                category_code,
                office_id,
                group_id,
                description,
                shared_alias_id,
                shared_ref_ts_id
            )
            SELECT category_code, office_id, ?2, ?3, ?4, ?5
            FROM ts_categories
            WHERE category_code = ?1;",
            params![
                group.category_code,
                group_id,
                normalize_text(group.description.as_deref()),
                normalize_text(group.shared_alias_id.as_deref()),
                normalize_text(group.shared_ref_ts_id.as_deref()),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(format!(
                "time-series category {}",
                group.category_code
            )));
        }

        Ok(self.conn.last_insert_rowid())
    }

    /// Registers a time-series identifier, returning the existing code when
    /// the identifier is already known for the office.
    pub fn register_time_series(&self, office_id: &str, ts_id: &str) -> RepoResult<i64> {
        let office_id = normalize_office(office_id)?;
        let ts_id = normalize_identifier("ts_id", ts_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO ts_identifiers (office_id, ts_id) VALUES (?1, ?2);",
            params![office_id, ts_id],
        )?;
        let ts_code = self.conn.query_row(
            "SELECT ts_code FROM ts_identifiers WHERE office_id = ?1 AND ts_id = ?2;",
            params![office_id, ts_id],
            |row| row.get(0),
        )?;
        Ok(ts_code)
    }

    /// Assigns a registered time series to a group, replacing any earlier
    /// assignment of the same pair.
    pub fn assign_time_series(&self, assignment: &NewAssignment) -> RepoResult<()> {
        if !row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM ts_groups WHERE group_code = ?1);",
            assignment.group_code,
        )? {
            return Err(RepoError::NotFound(format!(
                "time-series group {}",
                assignment.group_code
            )));
        }
        if !row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM ts_identifiers WHERE ts_code = ?1);",
            assignment.ts_code,
        )? {
            return Err(RepoError::NotFound(format!(
                "time series {}",
                assignment.ts_code
            )));
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO ts_group_assignments (
                group_code,
                ts_code,
                attribute,
                alias_id,
                ref_ts_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                assignment.group_code,
                assignment.ts_code,
                assignment.attribute,
                normalize_text(assignment.alias_id.as_deref()),
                normalize_text(assignment.ref_ts_id.as_deref()),
            ],
        )?;
        Ok(())
    }

    /// Looks up a group code by category code and group id.
    pub fn group_code(&self, category_code: i64, group_id: &str) -> RepoResult<Option<i64>> {
        let code = self
            .conn
            .query_row(
                "SELECT group_code FROM ts_groups WHERE category_code = ?1 AND group_id = ?2;",
                params![category_code, group_id.trim()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(code)
    }
}

impl CatalogSource for SqliteTsGroupCatalog<'_> {
    type Filter = TsGroupFilter;
    type Row = TsGroupRow;

    fn catalog_name(&self) -> &'static str {
        "ts_groups"
    }

    fn count(&self, filter: &TsGroupFilter) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) {GROUP_FROM_SQL}");
        let mut bind_values: Vec<Value> = Vec::new();
        push_group_filters(&mut sql, &mut bind_values, filter);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative group count {count}")))
    }

    fn scan(
        &self,
        filter: &TsGroupFilter,
        seek_after: Option<&TsGroupKey>,
        limit: u32,
    ) -> RepoResult<Vec<TsGroupRow>> {
        let mut sql = format!(
            "WITH page AS (
                SELECT g.group_code AS group_code, g.category_code AS category_code, g.group_id AS group_id
                {GROUP_FROM_SQL}"
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_group_filters(&mut sql, &mut bind_values, filter);

        if let Some(key) = seek_after {
            sql.push_str(
                " AND (g.category_code > ? OR (g.category_code = ? AND g.group_id > ?))",
            );
            bind_values.push(Value::Integer(key.category_code));
            bind_values.push(Value::Integer(key.category_code));
            bind_values.push(Value::Text(key.group_id.clone()));
        }

        sql.push_str(" ORDER BY g.category_code ASC, g.group_id ASC LIMIT ?)");
        bind_values.push(limit_value(limit));

        sql.push('\n');
        sql.push_str(PARENT_COLUMNS_SQL);
        if filter.include_assigned {
            sql.push_str(
                ",
                t.office_id AS ts_office_id,
                t.ts_id AS ts_id,
                a.attribute AS attribute,
                a.alias_id AS alias_id,
                a.ref_ts_id AS ref_ts_id
             FROM page
             INNER JOIN ts_groups g ON g.group_code = page.group_code
             INNER JOIN ts_categories c ON c.category_code = g.category_code
             LEFT JOIN ts_group_assignments a ON a.group_code = g.group_code
             LEFT JOIN ts_identifiers t ON t.ts_code = a.ts_code
             ORDER BY page.category_code ASC, page.group_id ASC, a.attribute ASC, t.ts_id ASC;",
            );
        } else {
            sql.push_str(
                ",
                NULL AS ts_office_id,
                NULL AS ts_id,
                NULL AS attribute,
                NULL AS alias_id,
                NULL AS ref_ts_id
             FROM page
             INNER JOIN ts_groups g ON g.group_code = page.group_code
             INNER JOIN ts_categories c ON c.category_code = g.category_code
             ORDER BY page.category_code ASC, page.group_id ASC;",
            );
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut parsed = Vec::new();
        while let Some(row) = rows.next()? {
            parsed.push(parse_group_row(row)?);
        }
        Ok(parsed)
    }
}

fn push_group_filters(sql: &mut String, bind_values: &mut Vec<Value>, filter: &TsGroupFilter) {
    push_office_filter(sql, bind_values, "g.office_id", filter.office_id.as_deref());
    push_mask_filter(sql, bind_values, "c.category_id", filter.category_id.as_deref());
    push_mask_filter(sql, bind_values, "g.group_id", filter.group_id.as_deref());

    if let Some(mask) = filter
        .time_series_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        sql.push_str(" AND EXISTS (SELECT 1 FROM ts_group_assignments fa INNER JOIN ts_identifiers ft ON ft.ts_code = fa.ts_code WHERE fa.group_code = g.group_code");
        push_mask_filter(sql, bind_values, "ft.ts_id", Some(mask));
        sql.push(')');
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<TsGroupRow> {
    Ok(TsGroupRow {
        category_code: row.get("category_code")?,
        category_office_id: row.get("category_office_id")?,
        category_id: row.get("category_id")?,
        category_description: row.get("category_description")?,
        group_office_id: row.get("group_office_id")?,
        group_id: row.get("group_id")?,
        group_description: row.get("group_description")?,
        shared_alias_id: row.get("shared_alias_id")?,
        shared_ref_ts_id: row.get("shared_ref_ts_id")?,
        ts_office_id: row.get("ts_office_id")?,
        ts_id: row.get("ts_id")?,
        attribute: row.get("attribute")?,
        alias_id: row.get("alias_id")?,
        ref_ts_id: row.get("ref_ts_id")?,
    })
}

fn row_exists(conn: &Connection, sql: &str, code: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(sql, [code], |row| row.get(0))?;
    Ok(exists == 1)
}
