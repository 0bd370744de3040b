#[cfg(test)]
mod tests {
    use crate::utils::{ApplicationXml, ContactXml, fixture_contract, fixture_now, fixture_path};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use engine_config::{load_contract, validation::contract::check_contract};
    use engine_processing::{DataMapper, FixedClock, ProcessingError, Validator};
    use model::{
        Value,
        contract::tables::TargetTable,
        records::{batch::MappedRecords, row::Row},
    };
    use std::{str::FromStr, sync::Arc};

    fn map(xml: &str) -> Result<MappedRecords, ProcessingError> {
        let contract = fixture_contract();
        let validator = Validator::new(contract.clone());
        let mapper = DataMapper::new(contract)?.with_clock(Arc::new(FixedClock(fixture_now())));

        let (validation, tree) = validator.validate_document(xml, "fixture");
        assert!(validation.can_process, "{:?}", validation.validation_errors);
        mapper.map(&tree.expect("parsed"), &validation)
    }

    fn standard(app_id: i64) -> MappedRecords {
        map(&ApplicationXml::standard(app_id).render()).unwrap()
    }

    fn only(records: &MappedRecords, table: TargetTable) -> &Row {
        let rows = records.rows(table);
        assert_eq!(rows.len(), 1, "{table}: {rows:?}");
        &rows[0]
    }

    fn decimal(raw: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(raw).unwrap())
    }

    #[test]
    fn test_fixture_contract_is_clean() {
        let contract = load_contract(&fixture_path("contract.json")).unwrap();
        assert!(check_contract(&contract).is_empty());
        assert_eq!(contract.target_tables().len(), 10);
    }

    #[test]
    fn test_application_level_tables() {
        let records = standard(1001);

        let base = only(&records, TargetTable::AppBase);
        assert_eq!(base.get("app_id"), Some(&Value::Int(1001)));
        assert_eq!(base.get("app_type_enum"), Some(&Value::Int(30)));
        assert_eq!(base.get("decision_enum"), Some(&Value::Int(1)));
        let received = NaiveDate::from_ymd_opt(2023, 11, 2)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(base.get("receive_date"), Some(&Value::Timestamp(received)));
        assert!(records.requires_identity_insert(TargetTable::AppBase));

        let ops = only(&records, TargetTable::AppOperational);
        assert_eq!(ops.get("app_id"), Some(&Value::Int(1001)));
        assert_eq!(ops.get("rushed_bit"), Some(&Value::Boolean(true)));
        assert_eq!(ops.get("assigned_to"), Some(&Value::from("ANALY")));
        assert_eq!(ops.get("primary_applicant_name"), Some(&Value::from("Ann")));
        assert_eq!(ops.get("primary_city"), Some(&Value::from("Bismarck")));

        let pricing = only(&records, TargetTable::AppPricing);
        assert_eq!(pricing.get("requested_amount"), Some(&decimal("12500.00")));
        assert_eq!(pricing.get("population_tier"), Some(&Value::from("CM")));
    }

    #[test]
    fn test_receive_date_falls_back_to_clock() {
        let xml = ApplicationXml::standard(1002)
            .without_application("app_receive_date")
            .render();
        let records = map(&xml).unwrap();
        let base = only(&records, TargetTable::AppBase);
        assert_eq!(base.get("receive_date"), Some(&Value::Timestamp(fixture_now())));
    }

    #[test]
    fn test_population_tier_else_branch() {
        let xml = ApplicationXml::standard(1003)
            .application("population_assignment", "ZZ")
            .render();
        let records = map(&xml).unwrap();
        assert_eq!(
            only(&records, TargetTable::AppPricing).get("population_tier"),
            Some(&Value::from("STD"))
        );
    }

    #[test]
    fn test_unmapped_app_type_uses_enum_default() {
        let xml = ApplicationXml::standard(1004)
            .application("app_type_code", "UNKNOWN")
            .render();
        let records = map(&xml).unwrap();
        assert_eq!(
            only(&records, TargetTable::AppBase).get("app_type_enum"),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn test_contacts_and_children() {
        let records = standard(1001);

        let contacts = records.rows(TargetTable::ContactBase);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].get("con_id"), Some(&Value::Int(10011)));
        assert_eq!(contacts[0].get("app_id"), Some(&Value::Int(1001)));
        assert_eq!(contacts[0].get("contact_type_enum"), Some(&Value::Int(281)));
        assert_eq!(contacts[0].get("first_name"), Some(&Value::from("ANN")));
        assert_eq!(contacts[0].get("home_phone"), Some(&Value::from("7015550100")));
        assert_eq!(
            contacts[0].get("birth_date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(1985, 3, 14).unwrap()))
        );
        assert_eq!(contacts[1].get("contact_type_enum"), Some(&Value::Int(280)));
        assert_eq!(contacts[1].get("first_name"), Some(&Value::from("BOB")));

        // The second CURR address replaces the first; MAIL has no enum value.
        let addresses = records.rows(TargetTable::ContactAddress);
        assert_eq!(addresses.len(), 2);
        let cities: Vec<_> = addresses.iter().map(|r| r.get("city").cloned()).collect();
        assert_eq!(
            cities,
            vec![Some(Value::from("Bismarck")), Some(Value::from("Minot"))]
        );
        assert!(addresses.iter().all(|r| r.get("con_id") == Some(&Value::Int(10011))));
        assert!(addresses.iter().all(|r| !r.contains("app_id")));

        let job = only(&records, TargetTable::ContactEmployment);
        assert_eq!(job.get("con_id"), Some(&Value::Int(10011)));
        assert_eq!(job.get("employment_type_enum"), Some(&Value::Int(350)));
        assert_eq!(job.get("months_at_job"), Some(&Value::Int(34)));
        assert_eq!(job.get("monthly_income"), Some(&decimal("4500.00")));
    }

    #[test]
    fn test_invalid_contacts_are_left_out() {
        let xml = ApplicationXml::standard(1005)
            .contacts(vec![
                ContactXml::new(51, "PR", "Pat").address("CURR", "Fargo", "ND"),
                ContactXml::new(52, "SEC", "Sam").address("CURR", "Minot", "ND"),
                ContactXml::new(53, "AUTHU", "Alex").without("con_id"),
            ])
            .render();
        let records = map(&xml).unwrap();

        let ids: Vec<_> = records
            .rows(TargetTable::ContactBase)
            .iter()
            .map(|r| r.get("con_id").cloned())
            .collect();
        assert_eq!(ids, vec![Some(Value::Int(51))]);
        assert_eq!(records.rows(TargetTable::ContactAddress).len(), 1);
    }

    #[test]
    fn test_collateral_slots() {
        let records = standard(1001);
        let slot = only(&records, TargetTable::AppCollateral);
        assert_eq!(slot.get("app_id"), Some(&Value::Int(1001)));
        assert_eq!(slot.get("sort_order"), Some(&Value::Int(1)));
        assert_eq!(slot.get("year"), Some(&Value::Int(2020)));
        assert_eq!(slot.get("make"), Some(&Value::from("FORD")));
        assert_eq!(slot.get("collateral_value"), Some(&decimal("15000.00")));

        let xml = ApplicationXml::standard(1006)
            .collateral("coll3_year", "2018")
            .collateral("coll3_make", "DODGE")
            .render();
        let records = map(&xml).unwrap();
        let orders: Vec<_> = records
            .rows(TargetTable::AppCollateral)
            .iter()
            .map(|r| r.get("sort_order").cloned())
            .collect();
        assert_eq!(orders, vec![Some(Value::Int(1)), Some(Value::Int(3))]);
    }

    #[test]
    fn test_key_value_tables() {
        let records = standard(1001);

        // "0" is a real score; a blank FICO produces nothing.
        let score = only(&records, TargetTable::Scores);
        assert_eq!(score.get("score_identifier"), Some(&Value::from("TU_TRIGGER")));
        assert_eq!(score.get("score"), Some(&Value::Int(0)));
        assert_eq!(score.get("app_id"), Some(&Value::Int(1001)));

        let indicator = only(&records, TargetTable::Indicators);
        assert_eq!(indicator.get("indicator"), Some(&Value::from("Rushed")));
        assert_eq!(indicator.get("value"), Some(&Value::from("Y")));

        let history = only(&records, TargetTable::AppHistoricalLookup);
        assert_eq!(history.get("name"), Some(&Value::from("legacy_status")));
        assert_eq!(history.get("source"), Some(&Value::from("application")));
        assert_eq!(history.get("value"), Some(&Value::from("ACTIVE")));

        let xml = ApplicationXml::standard(1007)
            .score("TU_TRIGGER", "None")
            .score("FICO", "712")
            .render();
        let records = map(&xml).unwrap();
        let score = only(&records, TargetTable::Scores);
        assert_eq!(score.get("score_identifier"), Some(&Value::from("FICO")));
        assert_eq!(score.get("score"), Some(&Value::Int(712)));
    }

    #[test]
    fn test_mapping_is_repeatable() {
        let xml = ApplicationXml::standard(1008).render();
        let first = map(&xml).unwrap();
        let second = map(&xml).unwrap();

        let order = fixture_contract().insertion_order();
        assert_eq!(first.to_json(&order), second.to_json(&order));
        assert_eq!(first.total_rows(), 12);
        assert_eq!(
            first.tables_populated(&order),
            vec![
                "app_base",
                "app_operational",
                "app_pricing",
                "contact_base",
                "contact_address",
                "contact_employment",
                "app_collateral",
                "scores",
                "indicators",
                "app_historical_lookup",
            ]
        );
    }

    #[test]
    fn test_document_without_app_id_cannot_be_mapped() {
        let contract = fixture_contract();
        let validator = Validator::new(contract.clone());
        let mapper = DataMapper::new(contract).unwrap();

        let xml = ApplicationXml::standard(1).without_app_id().render();
        let (validation, tree) = validator.validate_document(&xml, "no-id");
        assert!(!validation.can_process);
        assert!(matches!(
            mapper.map(&tree.unwrap(), &validation),
            Err(ProcessingError::MissingAppId)
        ));
    }
}
