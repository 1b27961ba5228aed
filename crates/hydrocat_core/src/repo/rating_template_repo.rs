//! Rating template catalog over SQLite.
//!
//! # Responsibility
//! - Page rating templates with their independent parameter specs.
//! - Create templates with a derived, canonical template id.
//!
//! # Invariants
//! - Catalog order is `template_code ASC`.
//! - Specs within a template are ordered by `position ASC`.
//! - Stored lookup methods must parse; unknown spellings are rejected on
//!   read instead of being masked.

use crate::model::rating_template::{
    template_id, IndependentParameterSpec, LookupMethod, RatingTemplate,
};
use crate::paging::{CatalogSource, FlatRow, SortKey};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{
    ensure_tables_ready, limit_value, normalize_identifier, normalize_office, normalize_text,
    push_mask_filter, push_office_filter, TableSpec,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[TableSpec] = &[
    (
        "rating_templates",
        &[
            "template_code",
            "office_id",
            "template_id",
            "dependent_parameter",
            "version",
            "description",
        ],
    ),
    (
        "rating_template_ind_params",
        &[
            "template_code",
            "position",
            "parameter_id",
            "in_range_method",
            "out_range_low_method",
            "out_range_high_method",
        ],
    ),
];

const TEMPLATE_FROM_SQL: &str = "FROM rating_templates rt WHERE 1 = 1";

/// Filters for the rating template catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingTemplateFilter {
    pub office_id: Option<String>,
    /// Template id mask (`*`/`?` wildcards), e.g. `Elev;Flow.*`.
    pub template_id: Option<String>,
}

/// Catalog position of one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RatingTemplateKey {
    pub template_code: i64,
}

impl SortKey for RatingTemplateKey {
    fn to_parts(&self) -> Vec<String> {
        vec![self.template_code.to_string()]
    }

    fn from_parts(parts: &[String]) -> Option<Self> {
        let [template_code] = parts else {
            return None;
        };
        Some(Self {
            template_code: template_code.parse().ok()?,
        })
    }
}

/// One row of the template/spec join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingTemplateRow {
    pub template_code: i64,
    pub office_id: String,
    pub template_id: String,
    pub dependent_parameter: String,
    pub version: String,
    pub description: Option<String>,
    pub position: Option<i64>,
    pub parameter_id: Option<String>,
    pub in_range_method: Option<LookupMethod>,
    pub out_range_low_method: Option<LookupMethod>,
    pub out_range_high_method: Option<LookupMethod>,
}

impl FlatRow for RatingTemplateRow {
    type Key = RatingTemplateKey;
    type Entity = RatingTemplate;

    fn parent_key(&self) -> RatingTemplateKey {
        RatingTemplateKey {
            template_code: self.template_code,
        }
    }

    fn parent(&self) -> RatingTemplate {
        RatingTemplate {
            office_id: self.office_id.clone(),
            id: self.template_id.clone(),
            version: self.version.clone(),
            dependent_parameter: self.dependent_parameter.clone(),
            description: self.description.clone(),
            independent_parameter_specs: Vec::new(),
        }
    }

    fn child(&self) -> Option<IndependentParameterSpec> {
        Some(IndependentParameterSpec {
            position: self.position?,
            parameter: self.parameter_id.clone()?,
            in_range_method: self.in_range_method?,
            out_range_low_method: self.out_range_low_method?,
            out_range_high_method: self.out_range_high_method?,
        })
    }
}

/// Lookup behavior for one independent parameter of a new template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParameterSpec {
    pub parameter: String,
    pub in_range_method: LookupMethod,
    pub out_range_low_method: LookupMethod,
    pub out_range_high_method: LookupMethod,
}

impl NewParameterSpec {
    /// Linear interpolation in range, errors outside of it.
    pub fn linear(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            in_range_method: LookupMethod::Linear,
            out_range_low_method: LookupMethod::Error,
            out_range_high_method: LookupMethod::Error,
        }
    }
}

/// Input for [`SqliteRatingTemplateCatalog::create_template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRatingTemplate {
    pub office_id: String,
    pub version: String,
    pub dependent_parameter: String,
    pub description: Option<String>,
    /// Independent parameters in template order.
    pub independent: Vec<NewParameterSpec>,
}

/// SQLite-backed rating template catalog.
pub struct SqliteRatingTemplateCatalog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRatingTemplateCatalog<'conn> {
    /// Creates the catalog from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    /// Creates one template and returns its derived template id.
    pub fn create_template(&self, template: &NewRatingTemplate) -> RepoResult<String> {
        let office_id = normalize_office(&template.office_id)?;
        let version = normalize_identifier("version", &template.version)?;
        let dependent = normalize_identifier("dependent_parameter", &template.dependent_parameter)?;
        if template.independent.is_empty() {
            return Err(RepoError::InvalidInput(
                "rating template needs at least one independent parameter".to_string(),
            ));
        }
        let independent = template
            .independent
            .iter()
            .map(|spec| normalize_identifier("independent parameter", &spec.parameter))
            .collect::<RepoResult<Vec<_>>>()?;
        let id = template_id(&independent, &dependent, &version);

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO rating_templates (
                office_id,
                template_id,
                dependent_parameter,
                version,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                office_id,
                id,
                dependent,
                version,
                normalize_text(template.description.as_deref()),
            ],
        )?;
        let template_code = tx.last_insert_rowid();

        for (index, (spec, parameter)) in template.independent.iter().zip(&independent).enumerate() {
            tx.execute(
                "INSERT INTO rating_template_ind_params (
                    template_code,
                    position,
                    parameter_id,
                    in_range_method,
                    out_range_low_method,
                    out_range_high_method
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    template_code,
                    index as i64 + 1,
                    parameter,
                    spec.in_range_method.as_str(),
                    spec.out_range_low_method.as_str(),
                    spec.out_range_high_method.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }
}

impl CatalogSource for SqliteRatingTemplateCatalog<'_> {
    type Filter = RatingTemplateFilter;
    type Row = RatingTemplateRow;

    fn catalog_name(&self) -> &'static str {
        "rating_templates"
    }

    fn count(&self, filter: &RatingTemplateFilter) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) {TEMPLATE_FROM_SQL}");
        let mut bind_values: Vec<Value> = Vec::new();
        push_template_filters(&mut sql, &mut bind_values, filter);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative template count {count}")))
    }

    fn scan(
        &self,
        filter: &RatingTemplateFilter,
        seek_after: Option<&RatingTemplateKey>,
        limit: u32,
    ) -> RepoResult<Vec<RatingTemplateRow>> {
        let mut sql = format!(
            "WITH page AS (
                SELECT rt.template_code AS template_code
                {TEMPLATE_FROM_SQL}"
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_template_filters(&mut sql, &mut bind_values, filter);

        if let Some(key) = seek_after {
            sql.push_str(" AND rt.template_code > ?");
            bind_values.push(Value::Integer(key.template_code));
        }

        sql.push_str(" ORDER BY rt.template_code ASC LIMIT ?)");
        bind_values.push(limit_value(limit));
        sql.push_str(
            "
            SELECT
                rt.template_code AS template_code,
                rt.office_id AS office_id,
                rt.template_id AS template_id,
                rt.dependent_parameter AS dependent_parameter,
                rt.version AS version,
                rt.description AS description,
                ip.position AS position,
                ip.parameter_id AS parameter_id,
                ip.in_range_method AS in_range_method,
                ip.out_range_low_method AS out_range_low_method,
                ip.out_range_high_method AS out_range_high_method
             FROM page
             INNER JOIN rating_templates rt ON rt.template_code = page.template_code
             LEFT JOIN rating_template_ind_params ip ON ip.template_code = rt.template_code
             ORDER BY page.template_code ASC, ip.position ASC;",
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut parsed = Vec::new();
        while let Some(row) = rows.next()? {
            parsed.push(parse_template_row(row)?);
        }
        Ok(parsed)
    }
}

fn push_template_filters(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    filter: &RatingTemplateFilter,
) {
    push_office_filter(sql, bind_values, "rt.office_id", filter.office_id.as_deref());
    push_mask_filter(sql, bind_values, "rt.template_id", filter.template_id.as_deref());
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<RatingTemplateRow> {
    Ok(RatingTemplateRow {
        template_code: row.get("template_code")?,
        office_id: row.get("office_id")?,
        template_id: row.get("template_id")?,
        dependent_parameter: row.get("dependent_parameter")?,
        version: row.get("version")?,
        description: row.get("description")?,
        position: row.get("position")?,
        parameter_id: row.get("parameter_id")?,
        in_range_method: parse_method(row, "in_range_method")?,
        out_range_low_method: parse_method(row, "out_range_low_method")?,
        out_range_high_method: parse_method(row, "out_range_high_method")?,
    })
}

fn parse_method(row: &Row<'_>, column: &str) -> RepoResult<Option<LookupMethod>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => LookupMethod::parse(&value).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid lookup method `{value}` in rating_template_ind_params.{column}"
            ))
        }),
        None => Ok(None),
    }
}
