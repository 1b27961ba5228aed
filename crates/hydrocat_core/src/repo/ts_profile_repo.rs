//! Time-series profile catalog over SQLite.
//!
//! # Responsibility
//! - Page profiles with their ordered parameter lists.
//! - Create locations and profiles for callers that populate the catalog.
//!
//! # Invariants
//! - Catalog order is `location_code ASC, key_parameter_id ASC`.
//! - Parameters within a profile are ordered by `position ASC`.
//! - The key parameter is always part of the parameter list it keys.

use crate::model::ts_profile::{ProfileParameter, TimeSeriesProfile};
use crate::paging::{CatalogSource, FlatRow, SortKey};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    ensure_tables_ready, limit_value, normalize_identifier, normalize_office, normalize_text,
    push_mask_filter, push_office_filter, TableSpec,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[TableSpec] = &[
    ("locations", &["location_code", "office_id", "location_id"]),
    (
        "ts_profiles",
        &[
            "location_code",
            "key_parameter_id",
            "description",
            "reference_ts_id",
        ],
    ),
    (
        "ts_profile_parameters",
        &["location_code", "key_parameter_id", "position", "parameter_id"],
    ),
];

const PROFILE_FROM_SQL: &str = "FROM ts_profiles p
    INNER JOIN locations l ON l.location_code = p.location_code
    WHERE 1 = 1";

/// Filters for the time-series profile catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsProfileFilter {
    pub office_id: Option<String>,
    /// Location mask (`*`/`?` wildcards).
    pub location_id: Option<String>,
    /// Key parameter mask (`*`/`?` wildcards).
    pub key_parameter_id: Option<String>,
}

/// Catalog position of one profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TsProfileKey {
    pub location_code: i64,
    pub key_parameter_id: String,
}

impl SortKey for TsProfileKey {
    fn to_parts(&self) -> Vec<String> {
        vec![
            self.location_code.to_string(),
            self.key_parameter_id.clone(),
        ]
    }

    fn from_parts(parts: &[String]) -> Option<Self> {
        let [location_code, key_parameter_id] = parts else {
            return None;
        };
        Some(Self {
            location_code: location_code.parse().ok()?,
            key_parameter_id: key_parameter_id.clone(),
        })
    }
}

/// One row of the profile/parameter join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsProfileRow {
    pub location_code: i64,
    pub office_id: String,
    pub location_id: String,
    pub key_parameter_id: String,
    pub description: Option<String>,
    pub reference_ts_id: Option<String>,
    pub position: Option<i64>,
    pub parameter_id: Option<String>,
}

impl FlatRow for TsProfileRow {
    type Key = TsProfileKey;
    type Entity = TimeSeriesProfile;

    fn parent_key(&self) -> TsProfileKey {
        TsProfileKey {
            location_code: self.location_code,
            key_parameter_id: self.key_parameter_id.clone(),
        }
    }

    fn parent(&self) -> TimeSeriesProfile {
        TimeSeriesProfile {
            office_id: self.office_id.clone(),
            location_id: self.location_id.clone(),
            key_parameter_id: self.key_parameter_id.clone(),
            description: self.description.clone(),
            reference_ts_id: self.reference_ts_id.clone(),
            parameter_list: Vec::new(),
        }
    }

    fn child(&self) -> Option<ProfileParameter> {
        Some(ProfileParameter {
            position: self.position?,
            parameter_id: self.parameter_id.clone()?,
        })
    }
}

/// Input for [`SqliteTsProfileCatalog::create_profile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTsProfile {
    pub office_id: String,
    pub location_id: String,
    pub key_parameter_id: String,
    pub description: Option<String>,
    pub reference_ts_id: Option<String>,
    /// Parameters in profile order; positions are assigned from 1.
    pub parameters: Vec<String>,
}

/// SQLite-backed time-series profile catalog.
pub struct SqliteTsProfileCatalog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTsProfileCatalog<'conn> {
    /// Creates the catalog from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    /// Registers a location, returning the existing code when known.
    pub fn register_location(&self, office_id: &str, location_id: &str) -> RepoResult<i64> {
        upsert_location(self.conn, office_id, location_id)
    }

    /// Creates a profile, its location and its parameter list in one
    /// transaction; nothing is written when any insert fails.
    ///
    /// # Errors
    /// - `InvalidInput` when the parameter list is empty, repeats a
    ///   parameter, or does not contain the key parameter.
    pub fn create_profile(&self, profile: &NewTsProfile) -> RepoResult<()> {
        let key_parameter_id = normalize_identifier("key_parameter_id", &profile.key_parameter_id)?;
        let parameters = profile
            .parameters
            .iter()
            .map(|parameter| normalize_identifier("parameter_id", parameter))
            .collect::<RepoResult<Vec<_>>>()?;
        validate_parameter_list(&key_parameter_id, &parameters)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let location_code = upsert_location(&tx, &profile.office_id, &profile.location_id)?;
        tx.execute(
            "INSERT INTO ts_profiles (
                location_code,
                key_parameter_id,
                description,
                reference_ts_id
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                location_code,
                key_parameter_id,
                normalize_text(profile.description.as_deref()),
                normalize_text(profile.reference_ts_id.as_deref()),
            ],
        )?;
        for (index, parameter) in parameters.iter().enumerate() {
            tx.execute(
                "INSERT INTO ts_profile_parameters (
                    location_code,
                    key_parameter_id,
                    position,
                    parameter_id
                ) VALUES (?1, ?2, ?3, ?4);",
                params![location_code, key_parameter_id, index as i64 + 1, parameter],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl CatalogSource for SqliteTsProfileCatalog<'_> {
    type Filter = TsProfileFilter;
    type Row = TsProfileRow;

    fn catalog_name(&self) -> &'static str {
        "ts_profiles"
    }

    fn count(&self, filter: &TsProfileFilter) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) {PROFILE_FROM_SQL}");
        let mut bind_values: Vec<Value> = Vec::new();
        push_profile_filters(&mut sql, &mut bind_values, filter);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative profile count {count}")))
    }

    fn scan(
        &self,
        filter: &TsProfileFilter,
        seek_after: Option<&TsProfileKey>,
        limit: u32,
    ) -> RepoResult<Vec<TsProfileRow>> {
        let mut sql = format!(
            "WITH page AS (
                SELECT p.location_code AS location_code, p.key_parameter_id AS key_parameter_id
                {PROFILE_FROM_SQL}"
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_profile_filters(&mut sql, &mut bind_values, filter);

        if let Some(key) = seek_after {
            sql.push_str(
                " AND (p.location_code > ? OR (p.location_code = ? AND p.key_parameter_id > ?))",
            );
            bind_values.push(Value::Integer(key.location_code));
            bind_values.push(Value::Integer(key.location_code));
            bind_values.push(Value::Text(key.key_parameter_id.clone()));
        }

        sql.push_str(" ORDER BY p.location_code ASC, p.key_parameter_id ASC LIMIT ?)");
        bind_values.push(limit_value(limit));
        sql.push_str(
            "
            SELECT
                l.location_code AS location_code,
                l.office_id AS office_id,
                l.location_id AS location_id,
                p.key_parameter_id AS key_parameter_id,
                p.description AS description,
                p.reference_ts_id AS reference_ts_id,
                pp.position AS position,
                pp.parameter_id AS parameter_id
             FROM page
             INNER JOIN ts_profiles p
                ON p.location_code = page.location_code
               AND p.key_parameter_id = page.key_parameter_id
             INNER JOIN locations l ON l.location_code = p.location_code
             LEFT JOIN ts_profile_parameters pp
                ON pp.location_code = p.location_code
               AND pp.key_parameter_id = p.key_parameter_id
             ORDER BY page.location_code ASC, page.key_parameter_id ASC, pp.position ASC;",
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut parsed = Vec::new();
        while let Some(row) = rows.next()? {
            parsed.push(parse_profile_row(row)?);
        }
        Ok(parsed)
    }
}

fn push_profile_filters(sql: &mut String, bind_values: &mut Vec<Value>, filter: &TsProfileFilter) {
    push_office_filter(sql, bind_values, "l.office_id", filter.office_id.as_deref());
    push_mask_filter(sql, bind_values, "l.location_id", filter.location_id.as_deref());
    push_mask_filter(
        sql,
        bind_values,
        "p.key_parameter_id",
        filter.key_parameter_id.as_deref(),
    );
}

fn upsert_location(conn: &Connection, office_id: &str, location_id: &str) -> RepoResult<i64> {
    let office_id = normalize_office(office_id)?;
    let location_id = normalize_identifier("location_id", location_id)?;
    conn.execute(
        "INSERT OR IGNORE INTO locations (office_id, location_id) VALUES (?1, ?2);",
        params![office_id, location_id],
    )?;
    let code = conn.query_row(
        "SELECT location_code FROM locations WHERE office_id = ?1 AND location_id = ?2;",
        params![office_id, location_id],
        |row| row.get(0),
    )?;
    Ok(code)
}

fn validate_parameter_list(key_parameter_id: &str, parameters: &[String]) -> RepoResult<()> {
    if parameters.is_empty() {
        return Err(RepoError::InvalidInput(
            "profile parameter list cannot be empty".to_string(),
        ));
    }
    for (index, parameter) in parameters.iter().enumerate() {
        if parameters[..index].contains(parameter) {
            return Err(RepoError::InvalidInput(format!(
                "profile parameter `{parameter}` is listed twice"
            )));
        }
    }
    if !parameters.iter().any(|parameter| parameter == key_parameter_id) {
        return Err(RepoError::InvalidInput(format!(
            "key parameter `{key_parameter_id}` must be in the parameter list"
        )));
    }
    Ok(())
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<TsProfileRow> {
    Ok(TsProfileRow {
        location_code: row.get("location_code")?,
        office_id: row.get("office_id")?,
        location_id: row.get("location_id")?,
        key_parameter_id: row.get("key_parameter_id")?,
        description: row.get("description")?,
        reference_ts_id: row.get("reference_ts_id")?,
        position: row.get("position")?,
        parameter_id: row.get("parameter_id")?,
    })
}
