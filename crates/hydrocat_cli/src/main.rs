//! Catalog page dump tool.
//!
//! # Responsibility
//! - Open a catalog database and print one page (or every page) as JSON.
//! - Report failures on stderr with exit code 1.

use clap::{Parser, ValueEnum};
use hydrocat_core::config::{CoreConfig, ENV_DB_PATH};
use hydrocat_core::db::open_db;
use hydrocat_core::paging::{CatalogSource, EntityOf};
use hydrocat_core::{
    init_logging_from_config, CatalogService, RatingTemplateFilter, SqliteRatingTemplateCatalog,
    SqliteTsGroupCatalog, SqliteTsProfileCatalog, TsGroupFilter, TsProfileFilter,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Catalog {
    Groups,
    Profiles,
    Templates,
}

#[derive(Debug, Parser)]
#[command(name = "hydrocat", version, about = "Print hydrologic catalog pages as JSON")]
struct Cli {
    /// SQLite catalog file.
    #[arg(env = ENV_DB_PATH)]
    db_path: PathBuf,

    /// Catalog to list.
    #[arg(value_enum)]
    catalog: Catalog,

    /// Office filter, matched case-insensitively.
    #[arg(long)]
    office: Option<String>,

    /// Identifier mask (`*`/`?`): group id, location id or template id.
    #[arg(long = "id")]
    id_mask: Option<String>,

    /// Requested page size; the configured default applies when omitted.
    #[arg(long)]
    page_size: Option<i64>,

    /// Cursor returned as `nextPage` by a previous call.
    #[arg(long)]
    cursor: Option<String>,

    /// Follow cursors and print every entity instead of one page.
    #[arg(long, conflicts_with = "cursor")]
    all: bool,

    /// Groups only: omit assigned time series.
    #[arg(long)]
    no_members: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    let conn = open_db(&cli.db_path)?;
    let office_id = cli.office.clone();
    let id_mask = cli.id_mask.clone();

    match cli.catalog {
        Catalog::Groups => {
            let filter = TsGroupFilter {
                office_id,
                group_id: id_mask,
                include_assigned: !cli.no_members,
                ..TsGroupFilter::default()
            };
            let service = CatalogService::new(SqliteTsGroupCatalog::try_new(&conn)?, config.page);
            print_listing(&service, &filter, cli)
        }
        Catalog::Profiles => {
            let filter = TsProfileFilter {
                office_id,
                location_id: id_mask,
                key_parameter_id: None,
            };
            let service =
                CatalogService::new(SqliteTsProfileCatalog::try_new(&conn)?, config.page);
            print_listing(&service, &filter, cli)
        }
        Catalog::Templates => {
            let filter = RatingTemplateFilter {
                office_id,
                template_id: id_mask,
            };
            let service =
                CatalogService::new(SqliteRatingTemplateCatalog::try_new(&conn)?, config.page);
            print_listing(&service, &filter, cli)
        }
    }
}

fn print_listing<S>(
    service: &CatalogService<S>,
    filter: &S::Filter,
    cli: &Cli,
) -> Result<(), Box<dyn Error>>
where
    S: CatalogSource,
    EntityOf<S>: Serialize,
{
    let json = if cli.all {
        let items = service.list_all(filter, cli.page_size)?;
        serde_json::to_string_pretty(&items)?
    } else {
        let page = service.list(filter, cli.cursor.as_deref(), cli.page_size)?;
        serde_json::to_string_pretty(&page)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Catalog, Cli};
    use clap::Parser;

    #[test]
    fn parses_positional_catalog_and_paging_flags() {
        let cli = Cli::try_parse_from([
            "hydrocat",
            "/tmp/catalog.db",
            "groups",
            "--office",
            "swt",
            "--page-size",
            "25",
            "--cursor",
            "abcd",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.catalog, Catalog::Groups);
        assert_eq!(cli.office.as_deref(), Some("swt"));
        assert_eq!(cli.page_size, Some(25));
        assert_eq!(cli.cursor.as_deref(), Some("abcd"));
        assert!(!cli.all);
    }

    #[test]
    fn all_and_cursor_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "hydrocat",
            "/tmp/catalog.db",
            "templates",
            "--all",
            "--cursor",
            "abcd",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_catalog_is_rejected() {
        assert!(Cli::try_parse_from(["hydrocat", "/tmp/catalog.db", "ratings"]).is_err());
    }
}
