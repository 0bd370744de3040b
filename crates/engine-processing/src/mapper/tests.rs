use super::*;
use crate::{mapper::clock::FixedClock, validation::Validator};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;
use tracing_test::traced_test;

const CONTRACT: &str = r#"{
    "source_table": "app_xml",
    "source_column": "app_XML",
    "xml_root_element": "Provenir",
    "key_identifiers": {
        "app_id": {"xml_path": "/Provenir/Request", "xml_attribute": "ID", "required": true}
    },
    "expression_scopes": {"application": "/Provenir/Request/CustApp/application"},
    "slot_groups": [{
        "target_table": "app_collateral",
        "xml_path": "/Provenir/Request/CustApp/application/collateral",
        "attribute_prefix": "coll{n}_",
        "slots": [1, 2],
        "ignored_suffixes": ["new_used_demo"],
        "slot_column": "sort_order"
    }],
    "relationships": [
        {"parent_table": "app_base", "child_table": "contact_base", "foreign_key_column": "app_id"},
        {"parent_table": "contact_base", "child_table": "contact_address", "foreign_key_column": "con_id"},
        {"parent_table": "contact_base", "child_table": "contact_employment", "foreign_key_column": "con_id"}
    ],
    "enum_mappings": {
        "app_type_enum": {"PRODB": 30, "": 1},
        "contact_type_enum": {"PR": 281, "AUTHU": 280},
        "address_type_enum": {"CURR": 1, "PREV": 2},
        "employment_type_enum": {"CURR": 1, "PREV": 2}
    },
    "mappings": [
        {"xml_path": "/Provenir/Request", "xml_attribute": "ID", "target_table": "app_base",
         "target_column": "app_id", "data_type": "int", "mapping_type": "identity_insert", "nullable": false},
        {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "app_type_code", "target_table": "app_base",
         "target_column": "app_type_enum", "data_type": "smallint", "mapping_type": "enum"},
        {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "app_receive_date", "target_table": "app_base",
         "target_column": "receive_date", "data_type": "datetime", "mapping_type": "default_getutcdate_if_null"},
        {"xml_path": "/Provenir/Request/CustApp/application", "target_table": "app_base",
         "target_column": "population_tier", "data_type": "varchar(10)", "mapping_type": "calculated_field",
         "expression": "CASE WHEN application.population_assignment = 'CM' THEN 'CM' ELSE 'OTHER' END"},

        {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "rushed_flag", "target_table": "app_operational",
         "target_column": "rushed_bit", "data_type": "bit", "mapping_type": "char_to_bit"},
        {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "assigned_to", "target_table": "app_operational",
         "target_column": "assigned_to", "data_type": "varchar(5)", "data_length": 5},
        {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "first_name", "target_table": "app_operational",
         "target_column": "primary_applicant_name", "data_type": "varchar(50)", "mapping_type": "last_valid_pr_contact"},
        {"xml_path": "/Provenir/Request/CustApp/contact/contact_address", "xml_attribute": "city", "target_table": "app_operational",
         "target_column": "primary_city", "data_type": "varchar(50)", "mapping_type": "curr_address_only"},

        {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "con_id", "target_table": "contact_base",
         "target_column": "con_id", "data_type": "int", "mapping_type": "identity_insert"},
        {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "ac_role_tp_c", "target_table": "contact_base",
         "target_column": "contact_type_enum", "data_type": "smallint", "mapping_type": "enum"},
        {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "first_name", "target_table": "contact_base",
         "target_column": "first_name", "data_type": "varchar(50)", "mapping_type": "trim, upper"},

        {"xml_path": "/Provenir/Request/CustApp/contact/contact_address", "xml_attribute": "address_tp_c", "target_table": "contact_address",
         "target_column": "address_type_enum", "data_type": "smallint", "mapping_type": "enum"},
        {"xml_path": "/Provenir/Request/CustApp/contact/contact_address", "xml_attribute": "city", "target_table": "contact_address",
         "target_column": "city", "data_type": "varchar(50)"},

        {"xml_path": "/Provenir/Request/CustApp/contact/contact_employment", "xml_attribute": "employment_tp_c", "target_table": "contact_employment",
         "target_column": "employment_type_enum", "data_type": "smallint", "mapping_type": "enum"},
        {"xml_path": "/Provenir/Request/CustApp/contact/contact_employment", "target_table": "contact_employment",
         "target_column": "months_at_job", "data_type": "int", "mapping_type": "calculated_field",
         "expression": "b_years_at_job * 12 + b_months_at_job"},

        {"xml_path": "/Provenir/Request/CustApp/application/collateral", "xml_attribute": "coll{n}_year", "target_table": "app_collateral",
         "target_column": "year", "data_type": "smallint"},
        {"xml_path": "/Provenir/Request/CustApp/application/collateral", "xml_attribute": "coll{n}_value", "target_table": "app_collateral",
         "target_column": "collateral_value", "data_type": "decimal(12,2)"},

        {"xml_path": "/Provenir/Request/CustApp/rmts_info", "xml_attribute": "TU_TRIGGER", "target_table": "scores",
         "target_column": "score", "data_type": "int", "mapping_type": "add_score(TU_TRIGGER)"},
        {"xml_path": "/Provenir/Request/CustApp/rmts_info", "xml_attribute": "FICO", "target_table": "scores",
         "target_column": "score", "data_type": "int", "mapping_type": "add_score(FICO)"},
        {"xml_path": "/Provenir/Request/CustApp/rmts_info", "xml_attribute": "BK", "target_table": "scores",
         "target_column": "score", "data_type": "int", "mapping_type": "add_score(BK)"},
        {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "rush_ind", "target_table": "indicators",
         "target_column": "value", "data_type": "varchar(10)", "mapping_type": "add_indicator(Rushed)"}
    ]
}"#;

const DOCUMENT: &str = r#"
<Provenir>
  <Request ID="1001">
    <CustApp>
      <application app_type_code="PRODB" rushed_flag="Y" assigned_to="ANALYST" rush_ind="Y" population_assignment="CM">
        <collateral coll1_year="2020" coll1_value="15000.00" coll1_new_used_demo="U"
                    coll2_new_used_demo="U" coll2_value="0.00"/>
      </application>
      <rmts_info TU_TRIGGER="0" FICO="" BK="None"/>
      <contact con_id="1" ac_role_tp_c="PR" first_name=" ann ">
        <contact_address address_tp_c="CURR" city="Fargo"/>
        <contact_address address_tp_c="PREV" city="Minot"/>
        <contact_address address_tp_c="CURR" city="Bismarck"/>
        <contact_employment employment_tp_c="CURR" b_years_at_job="2" b_months_at_job="10"/>
      </contact>
      <contact con_id="2" ac_role_tp_c="AUTHU" first_name="bob">
        <contact_address address_tp_c="MAIL" city="Nowhere"/>
      </contact>
      <contact con_id="3" ac_role_tp_c="SEC" first_name="eve"/>
    </CustApp>
  </Request>
</Provenir>"#;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn mapper_for(contract: &str) -> DataMapper {
    let contract = Arc::new(MappingContract::from_json(contract).unwrap());
    DataMapper::new(contract)
        .unwrap()
        .with_clock(Arc::new(FixedClock(now())))
}

fn map(mapper: &DataMapper, xml: &str) -> Result<MappedRecords, ProcessingError> {
    let validator = Validator::new(Arc::new(mapper.contract().clone()));
    let (validation, tree) = validator.validate_document(xml, "test");
    mapper.map(&tree.expect("well-formed test document"), &validation)
}

fn int(v: i64) -> Value {
    Value::Int(v)
}

#[test]
fn test_application_tables() {
    let records = map(&mapper_for(CONTRACT), DOCUMENT).unwrap();

    let base = records.rows(TargetTable::AppBase);
    assert_eq!(base.len(), 1);
    assert_eq!(base[0].get("app_id"), Some(&int(1001)));
    assert_eq!(base[0].get("app_type_enum"), Some(&int(30)));
    assert_eq!(base[0].get("receive_date"), Some(&Value::Timestamp(now())));
    assert_eq!(base[0].get("population_tier"), Some(&Value::from("CM")));
    assert!(records.requires_identity_insert(TargetTable::AppBase));

    let ops = records.rows(TargetTable::AppOperational);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].get("rushed_bit"), Some(&Value::Boolean(true)));
    assert_eq!(ops[0].get("assigned_to"), Some(&Value::from("ANALY")));
    assert_eq!(ops[0].get("primary_applicant_name"), Some(&Value::from("ann")));
    assert_eq!(ops[0].get("primary_city"), Some(&Value::from("Bismarck")));
    assert_eq!(ops[0].get("app_id"), Some(&int(1001)));
    assert!(!records.requires_identity_insert(TargetTable::AppOperational));
}

#[test]
fn test_contact_rows_follow_valid_contacts() {
    let records = map(&mapper_for(CONTRACT), DOCUMENT).unwrap();

    let contacts = records.rows(TargetTable::ContactBase);
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].get("con_id"), Some(&int(1)));
    assert_eq!(contacts[0].get("contact_type_enum"), Some(&int(281)));
    assert_eq!(contacts[0].get("first_name"), Some(&Value::from("ANN")));
    assert_eq!(contacts[0].get("app_id"), Some(&int(1001)));
    assert_eq!(contacts[1].get("contact_type_enum"), Some(&int(280)));
    assert!(records.requires_identity_insert(TargetTable::ContactBase));
}

#[test]
fn test_contact_children_dedup_and_critical_enum() {
    let records = map(&mapper_for(CONTRACT), DOCUMENT).unwrap();

    let addresses = records.rows(TargetTable::ContactAddress);
    assert_eq!(addresses.len(), 2, "{addresses:?}");
    assert_eq!(addresses[0].get("city"), Some(&Value::from("Bismarck")));
    assert_eq!(addresses[0].get("address_type_enum"), Some(&int(1)));
    assert_eq!(addresses[1].get("city"), Some(&Value::from("Minot")));
    assert!(addresses.iter().all(|r| r.get("con_id") == Some(&int(1))));
    assert!(addresses.iter().all(|r| r.get("app_id").is_none()));

    let employment = records.rows(TargetTable::ContactEmployment);
    assert_eq!(employment.len(), 1);
    assert_eq!(employment[0].get("months_at_job"), Some(&int(34)));
    assert_eq!(employment[0].get("con_id"), Some(&int(1)));
}

#[test]
fn test_slots_and_key_values() {
    let records = map(&mapper_for(CONTRACT), DOCUMENT).unwrap();

    let collateral = records.rows(TargetTable::AppCollateral);
    assert_eq!(collateral.len(), 1);
    assert_eq!(collateral[0].get("sort_order"), Some(&int(1)));
    assert_eq!(collateral[0].get("year"), Some(&int(2020)));
    assert_eq!(
        collateral[0].get("collateral_value"),
        Some(&Value::Decimal(BigDecimal::from_str("15000.00").unwrap()))
    );

    let scores = records.rows(TargetTable::Scores);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].get("score_identifier"), Some(&Value::from("TU_TRIGGER")));
    assert_eq!(scores[0].get("score"), Some(&int(0)));

    let indicators = records.rows(TargetTable::Indicators);
    assert_eq!(indicators.len(), 1);
    assert_eq!(indicators[0].get("indicator"), Some(&Value::from("Rushed")));
    assert_eq!(indicators[0].get("value"), Some(&Value::from("Y")));
}

#[test]
fn test_ignored_slot_attribute_alone_yields_no_row() {
    let xml = r#"
        <Provenir><Request ID="5"><CustApp>
          <application><collateral coll1_new_used_demo="U"/></application>
          <contact con_id="1" ac_role_tp_c="PR"/>
        </CustApp></Request></Provenir>"#;
    let records = map(&mapper_for(CONTRACT), xml).unwrap();
    assert!(records.rows(TargetTable::AppCollateral).is_empty());
}

#[test]
fn test_mapping_twice_is_identical() {
    let mapper = mapper_for(CONTRACT);
    let first = map(&mapper, DOCUMENT).unwrap();
    let second = map(&mapper, DOCUMENT).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.tables_populated(mapper.insertion_order()),
        vec![
            "app_base",
            "app_operational",
            "contact_base",
            "contact_address",
            "contact_employment",
            "app_collateral",
            "scores",
            "indicators"
        ]
    );
}

#[test]
fn test_missing_app_id_is_rejected() {
    let mapper = mapper_for(CONTRACT);
    let err = map(&mapper, r#"<Provenir><Request/></Provenir>"#).unwrap_err();
    assert!(matches!(err, ProcessingError::MissingAppId));
}

#[test]
fn test_no_rows_is_a_mapping_failure() {
    let contract = r#"{
        "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
        "key_identifiers": {"app_id": {"xml_path": "/Provenir/Request", "xml_attribute": "ID"}},
        "validation_rules": {"require_valid_contact": false},
        "mappings": [
            {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "first_name",
             "target_table": "contact_base", "target_column": "first_name", "data_type": "varchar(20)"}
        ]
    }"#;
    let err = map(&mapper_for(contract), r#"<Provenir><Request ID="8"/></Provenir>"#).unwrap_err();
    assert!(matches!(err, ProcessingError::EmptyResult { app_id: 8 }));
}

#[traced_test]
#[test]
fn test_failing_expression_leaves_field_absent() {
    let contract = r#"{
        "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
        "key_identifiers": {"app_id": {"xml_path": "/Provenir/Request", "xml_attribute": "ID"}},
        "validation_rules": {"require_valid_contact": false},
        "mappings": [
            {"xml_path": "/Provenir/Request", "target_table": "app_base", "target_column": "ratio",
             "data_type": "decimal", "mapping_type": "calculated_field", "expression": "a / b"},
            {"xml_path": "/Provenir/Request", "xml_attribute": "a", "target_table": "app_base",
             "target_column": "a", "data_type": "int"}
        ]
    }"#;
    let records = map(
        &mapper_for(contract),
        r#"<Provenir><Request ID="8" a="1" b="0"/></Provenir>"#,
    )
    .unwrap();

    let base = records.rows(TargetTable::AppBase);
    assert_eq!(base.len(), 1);
    assert_eq!(base[0].get("ratio"), None);
    assert_eq!(base[0].get("a"), Some(&int(1)));
    assert!(logs_contain("Stage failed"));
}

#[test]
fn test_missing_element_still_applies_fallbacks() {
    let contract = r#"{
        "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
        "key_identifiers": {"app_id": {"xml_path": "/Provenir/Request", "xml_attribute": "ID"}},
        "validation_rules": {"require_valid_contact": false},
        "mappings": [
            {"xml_path": "/Provenir/Request", "xml_attribute": "ID", "target_table": "app_base",
             "target_column": "app_id", "data_type": "int", "mapping_type": "identity_insert"},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "app_receive_date",
             "target_table": "app_base", "target_column": "receive_date", "data_type": "datetime",
             "mapping_type": "default_getutcdate_if_null"},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "priority",
             "target_table": "app_base", "target_column": "priority", "data_type": "int", "default_value": 3},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "status",
             "target_table": "app_base", "target_column": "status", "data_type": "varchar(5)", "nullable": false},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "rushed_flag",
             "target_table": "app_operational", "target_column": "rushed_flag", "data_type": "varchar(1)"},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "assigned_to",
             "target_table": "app_operational", "target_column": "assigned_to", "data_type": "varchar(5)",
             "required": true}
        ]
    }"#;
    let records = map(
        &mapper_for(contract),
        r#"<Provenir><Request ID="1001"><CustApp rushed_flag="Y"/></Request></Provenir>"#,
    )
    .unwrap();

    let base = records.rows(TargetTable::AppBase);
    assert_eq!(base.len(), 1);
    assert_eq!(base[0].get("receive_date"), Some(&Value::Timestamp(now())));
    assert_eq!(base[0].get("priority"), Some(&int(3)));
    assert_eq!(base[0].get("status"), Some(&Value::from("")));
    assert!(records.rows(TargetTable::AppOperational).is_empty());
}

#[test]
fn test_required_field_on_missing_element_drops_root_row() {
    let contract = r#"{
        "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
        "key_identifiers": {"app_id": {"xml_path": "/Provenir/Request", "xml_attribute": "ID"}},
        "validation_rules": {"require_valid_contact": false},
        "mappings": [
            {"xml_path": "/Provenir/Request", "xml_attribute": "ID", "target_table": "app_base",
             "target_column": "app_id", "data_type": "int"},
            {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "app_type_code",
             "target_table": "app_base", "target_column": "app_type", "data_type": "varchar(10)",
             "required": true},
            {"xml_path": "/Provenir/Request", "xml_attribute": "ID", "target_table": "app_pricing",
             "target_column": "app_id", "data_type": "int"}
        ]
    }"#;
    let records = map(
        &mapper_for(contract),
        r#"<Provenir><Request ID="1001"><CustApp/></Request></Provenir>"#,
    )
    .unwrap();

    assert!(records.rows(TargetTable::AppBase).is_empty());
    assert_eq!(records.rows(TargetTable::AppPricing).len(), 1);
}

#[test]
fn test_push_unique_keeps_last() {
    let row = |con: i64, ty: i64, city: &str| -> Row {
        [
            ("con_id".to_string(), Value::Int(con)),
            ("address_type_enum".to_string(), Value::Int(ty)),
            ("city".to_string(), Value::from(city)),
        ]
        .into_iter()
        .collect()
    };
    let key = TargetTable::ContactAddress.unique_key();

    let mut rows = Vec::new();
    push_unique(&mut rows, row(1, 1, "a"), key);
    push_unique(&mut rows, row(1, 2, "b"), key);
    push_unique(&mut rows, row(1, 1, "c"), key);
    push_unique(&mut rows, row(2, 1, "d"), key);

    let cities: Vec<_> = rows.iter().map(|r| r.get("city").cloned()).collect();
    assert_eq!(
        cities,
        vec![
            Some(Value::from("c")),
            Some(Value::from("b")),
            Some(Value::from("d"))
        ]
    );
}
