use hydrocat_core::db::open_db_in_memory;
use hydrocat_core::paging::{fetch_page, PageError, RetrievalStage};
use hydrocat_core::repo::rating_template_repo::{NewParameterSpec, NewRatingTemplate};
use hydrocat_core::{LookupMethod, RatingTemplateFilter, RepoError, SqliteRatingTemplateCatalog};
use serde_json::json;

fn template(office_id: &str, independent: &[&str], dependent: &str, version: &str) -> NewRatingTemplate {
    NewRatingTemplate {
        office_id: office_id.to_string(),
        version: version.to_string(),
        dependent_parameter: dependent.to_string(),
        description: None,
        independent: independent
            .iter()
            .map(|parameter| NewParameterSpec::linear(*parameter))
            .collect(),
    }
}

#[test]
fn create_template_derives_the_template_id() {
    let conn = open_db_in_memory().unwrap();
    let catalog = SqliteRatingTemplateCatalog::try_new(&conn).unwrap();

    let id = catalog
        .create_template(&template("SWT", &["Elev"], "Flow", "USGS-EXSA"))
        .unwrap();
    assert_eq!(id, "Elev;Flow.USGS-EXSA");

    let id = catalog
        .create_template(&template(
            "SWT",
            &["Elev", "Count-Conduit_Gates"],
            "Flow",
            "Standard",
        ))
        .unwrap();
    assert_eq!(id, "Elev,Count-Conduit_Gates;Flow.Standard");

    let err = catalog
        .create_template(&template("SWT", &[], "Flow", "Standard"))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidInput(_)));
}

#[test]
fn templates_page_with_ordered_parameter_specs() {
    let conn = open_db_in_memory().unwrap();
    let catalog = SqliteRatingTemplateCatalog::try_new(&conn).unwrap();
    catalog
        .create_template(&template("SWT", &["Elev"], "Flow", "USGS-EXSA"))
        .unwrap();
    let mut gated = template("SWT", &["Elev", "Opening"], "Flow", "Gates");
    gated.independent[1].out_range_high_method = LookupMethod::Nearest;
    catalog.create_template(&gated).unwrap();
    catalog
        .create_template(&template("SWT", &["Stage"], "Flow", "Linear"))
        .unwrap();

    let filter = RatingTemplateFilter::default();
    let first = fetch_page(&catalog, &filter, None, 2).unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);
    let specs = &first.items[1].independent_parameter_specs;
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].position, 1);
    assert_eq!(specs[1].parameter, "Opening");
    assert_eq!(specs[1].out_range_high_method, LookupMethod::Nearest);

    let second = fetch_page(&catalog, &filter, first.next_page.as_deref(), 2).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, "Stage;Flow.Linear");
    assert_eq!(second.next_page, None);

    let value = serde_json::to_value(&second.items[0]).unwrap();
    assert_eq!(
        value["independent-parameter-specs"][0]["in-range-method"],
        json!("LINEAR")
    );
}

#[test]
fn template_id_mask_keeps_separators_literal() {
    let conn = open_db_in_memory().unwrap();
    let catalog = SqliteRatingTemplateCatalog::try_new(&conn).unwrap();
    catalog
        .create_template(&template("SWT", &["Elev"], "Flow", "USGS-EXSA"))
        .unwrap();
    catalog
        .create_template(&template("SWT", &["Elev", "Opening"], "Flow", "Gates"))
        .unwrap();
    catalog
        .create_template(&template("LRL", &["Elev"], "Flow", "Standard"))
        .unwrap();

    let filter = RatingTemplateFilter {
        office_id: Some("SWT".to_string()),
        template_id: Some("elev;flow.*".to_string()),
    };
    let page = fetch_page(&catalog, &filter, None, 10).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, "Elev;Flow.USGS-EXSA");
}

#[test]
fn unknown_stored_lookup_method_surfaces_as_retrieval_error() {
    let conn = open_db_in_memory().unwrap();
    let catalog = SqliteRatingTemplateCatalog::try_new(&conn).unwrap();
    catalog
        .create_template(&template("SWT", &["Elev"], "Flow", "USGS-EXSA"))
        .unwrap();
    conn.execute(
        "UPDATE rating_template_ind_params SET in_range_method = 'SPLINE';",
        [],
    )
    .unwrap();

    let err = fetch_page(&catalog, &RatingTemplateFilter::default(), None, 10).unwrap_err();
    match err {
        PageError::Retrieval {
            catalog,
            stage,
            source,
            ..
        } => {
            assert_eq!(catalog, "rating_templates");
            assert_eq!(stage, RetrievalStage::Scan);
            assert!(matches!(source, RepoError::InvalidData(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}
