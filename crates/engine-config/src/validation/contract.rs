use crate::{
    error::ContractError,
    report::finding::{self as codes, Finding, FindingKind},
};
use expression_engine::CompiledExpression;
use model::{
    contract::{
        MappingContract,
        mapping_type::{MappingType, split_chain},
        tables::{TableScope, TargetTable},
    },
    core::data_type::DataType,
};
use std::{collections::HashSet, path::Path};
use tracing::{info, warn};

/// Reads, checks and returns a contract. Any error-severity finding is fatal;
/// warnings are logged.
pub fn load_contract(path: &Path) -> Result<MappingContract, ContractError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let contract = load_contract_str(&raw)?;
    info!(
        path = %path.display(),
        mappings = contract.mappings.len(),
        enums = contract.enum_mappings.len(),
        "Loaded mapping contract"
    );
    Ok(contract)
}

pub fn load_contract_str(raw: &str) -> Result<MappingContract, ContractError> {
    let json: serde_json::Value = serde_json::from_str(raw)?;

    // Vocabulary problems are collected from the raw JSON first so that all
    // of them are reported, not just the first one serde trips over.
    let findings = check_vocabulary(&json);
    if findings.iter().any(Finding::is_error) {
        return Err(ContractError::Invalid(findings));
    }

    let contract: MappingContract = serde_json::from_value(json)?;
    let findings = check_contract(&contract);
    for finding in findings.iter().filter(|f| !f.is_error()) {
        warn!(code = %finding.code, "{finding}");
    }
    if findings.iter().any(Finding::is_error) {
        return Err(ContractError::Invalid(findings));
    }
    Ok(contract)
}

/// Unknown tables, mapping types and data types in the raw document.
pub fn check_vocabulary(json: &serde_json::Value) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(mappings) = json.get("mappings").and_then(|m| m.as_array()) else {
        return findings;
    };

    for (i, mapping) in mappings.iter().enumerate() {
        let at = format!("mappings[{i}]");

        match mapping.get("target_table").and_then(|t| t.as_str()) {
            Some(table) if table.parse::<TargetTable>().is_err() => findings.push(
                Finding::error(
                    codes::CODE_UNKNOWN_TABLE,
                    format!("unknown target table '{table}'"),
                    FindingKind::Mapping,
                )
                .at(&at),
            ),
            _ => {}
        }

        if let Some(data_type) = mapping.get("data_type").and_then(|t| t.as_str()) {
            if let Err(e) = data_type.parse::<DataType>() {
                findings.push(
                    Finding::error(codes::CODE_UNKNOWN_DATA_TYPE, e, FindingKind::Mapping).at(&at),
                );
            }
        }

        let tags: Vec<String> = match mapping.get("mapping_type") {
            Some(serde_json::Value::String(s)) => split_chain(s),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|t| t.as_str())
                .flat_map(split_chain)
                .collect(),
            _ => Vec::new(),
        };
        for tag in tags {
            if let Err(e) = tag.parse::<MappingType>() {
                findings.push(
                    Finding::error(codes::CODE_UNKNOWN_MAPPING_TYPE, e, FindingKind::Mapping)
                        .at(&at),
                );
            }
        }
    }

    findings
}

/// Structural invariants of a typed contract.
pub fn check_contract(contract: &MappingContract) -> Vec<Finding> {
    let mut findings = Vec::new();
    let root = contract.root_path();

    if contract.xml_root_element.trim().is_empty() {
        findings.push(Finding::error(
            codes::CODE_MISSING_ROOT,
            "xml_root_element is empty",
            FindingKind::Structure,
        ));
    }

    for name in &contract.validation_rules.required_identifiers {
        if contract.key_identifier(name).is_none() {
            findings.push(Finding::error(
                codes::CODE_IDENTIFIER_MISSING,
                format!("required identifier '{name}' has no key_identifiers entry"),
                FindingKind::Structure,
            ));
        }
    }

    let mut seen = HashSet::new();
    for (i, mapping) in contract.mappings.iter().enumerate() {
        let at = format!("mappings[{i}] ({}.{})", mapping.target_table, mapping.target_column);

        if mapping.xml_path != root && !mapping.xml_path.starts_with(&format!("{root}/")) {
            findings.push(
                Finding::error(
                    codes::CODE_PATH_NOT_ROOTED,
                    format!("xml_path '{}' is not under '{root}'", mapping.xml_path),
                    FindingKind::Mapping,
                )
                .at(&at),
            );
        }

        if !seen.insert(mapping.signature()) {
            findings.push(
                Finding::error(
                    codes::CODE_DUPLICATE_MAPPING,
                    "duplicate (xml_path, xml_attribute, target_table, target_column)",
                    FindingKind::Mapping,
                )
                .at(&at),
            );
        }

        check_expression(mapping, &at, &mut findings);

        if mapping.has(&MappingType::Enum) && contract.enum_table(&mapping.enum_name()).is_none() {
            findings.push(
                Finding::error(
                    codes::CODE_ENUM_MISSING,
                    format!("enum table '{}' is not defined", mapping.enum_name()),
                    FindingKind::Lookup,
                )
                .at(&at),
            );
        }

        let is_key_value = mapping.key_value().is_some();
        let key_value_table = mapping.target_table.scope() == TableScope::KeyValue;
        if is_key_value != key_value_table {
            findings.push(
                Finding::error(
                    codes::CODE_KEY_VALUE_TABLE,
                    "add_score/add_indicator/add_history must target a key-value table and vice versa",
                    FindingKind::Mapping,
                )
                .at(&at),
            );
        }

        if mapping.target_table.scope() == TableScope::Slot
            && contract.slot_group(mapping.target_table).is_none()
        {
            findings.push(
                Finding::error(
                    codes::CODE_SLOT_GROUP,
                    format!("no slot group defined for {}", mapping.target_table),
                    FindingKind::Mapping,
                )
                .at(&at),
            );
        }
    }

    for group in &contract.slot_groups {
        if !group.attribute_prefix.contains("{n}") {
            findings.push(
                Finding::error(
                    codes::CODE_SLOT_GROUP,
                    format!("attribute_prefix '{}' has no {{n}} placeholder", group.attribute_prefix),
                    FindingKind::Structure,
                )
                .at(group.target_table.as_str()),
            );
        }
    }

    for name in &contract.critical_enums {
        if let Some(table) = contract.enum_table(name) {
            if table.default_value().is_some() {
                findings.push(Finding::error(
                    codes::CODE_CRITICAL_ENUM_DEFAULT,
                    format!("critical enum '{name}' must not declare a \"\" default"),
                    FindingKind::Lookup,
                ));
            }
        }
    }

    let mapped: HashSet<TargetTable> = contract.mappings.iter().map(|m| m.target_table).collect();
    for rel in &contract.relationships {
        if mapped.contains(&rel.child_table) && !mapped.contains(&rel.parent_table) {
            findings.push(
                Finding::warning(
                    codes::CODE_ORPHAN_RELATIONSHIP,
                    format!(
                        "{} is mapped but its parent {} is not",
                        rel.child_table, rel.parent_table
                    ),
                    FindingKind::Relationship,
                )
                .at(rel.foreign_key_column.as_str()),
            );
        }
    }

    findings
}

fn check_expression(
    mapping: &model::contract::field::FieldMapping,
    at: &str,
    findings: &mut Vec<Finding>,
) {
    let calculated = mapping.has(&MappingType::CalculatedField);
    match (&mapping.expression, calculated) {
        (None, true) => findings.push(
            Finding::error(
                codes::CODE_EXPRESSION_MISSING,
                "calculated_field mapping has no expression",
                FindingKind::Expression,
            )
            .at(at),
        ),
        (Some(expr), true) => {
            if let Err(e) = CompiledExpression::compile(expr) {
                findings.push(
                    Finding::error(codes::CODE_EXPRESSION_INVALID, e.to_string(), FindingKind::Expression)
                        .at(at),
                );
            }
        }
        (Some(_), false) => findings.push(
            Finding::warning(
                codes::CODE_EXPRESSION_UNUSED,
                "expression is ignored without calculated_field",
                FindingKind::Expression,
            )
            .at(at),
        ),
        (None, false) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract_json(mappings: &str) -> String {
        format!(
            r#"{{
                "source_table": "app_xml",
                "source_column": "app_XML",
                "xml_root_element": "Provenir",
                "key_identifiers": {{
                    "app_id": {{"xml_path": "/Provenir/Request", "xml_attribute": "ID", "required": true}}
                }},
                "enum_mappings": {{
                    "app_type_enum": {{"PRODB": 30, "": 1}},
                    "contact_type_enum": {{"PR": 281, "AUTHU": 280}}
                }},
                "mappings": [{mappings}]
            }}"#
        )
    }

    #[test]
    fn test_valid_contract_loads() {
        let raw = contract_json(
            r#"{"xml_path": "/Provenir/Request", "xml_attribute": "ID", "target_table": "app_base",
                "target_column": "app_id", "data_type": "int", "mapping_type": "identity_insert"},
               {"xml_path": "/Provenir/Request/CustApp/application", "xml_attribute": "app_type_code",
                "target_table": "app_base", "target_column": "app_type_enum", "data_type": "int",
                "mapping_type": "enum"}"#,
        );
        let contract = load_contract_str(&raw).unwrap();
        assert_eq!(contract.mappings.len(), 2);
    }

    #[test]
    fn test_all_vocabulary_errors_are_reported() {
        let raw = contract_json(
            r#"{"xml_path": "/Provenir/Request", "xml_attribute": "a", "target_table": "app_nowhere",
                "target_column": "a", "data_type": "int"},
               {"xml_path": "/Provenir/Request", "xml_attribute": "b", "target_table": "app_base",
                "target_column": "b", "data_type": "int", "mapping_type": "enum, frobnicate"}"#,
        );
        let err = load_contract_str(&raw).unwrap_err();
        let codes: Vec<_> = err.findings().iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, [codes::CODE_UNKNOWN_TABLE, codes::CODE_UNKNOWN_MAPPING_TYPE]);
    }

    #[test]
    fn test_structural_errors() {
        let raw = contract_json(
            r#"{"xml_path": "/Other/Request", "xml_attribute": "ID", "target_table": "app_base",
                "target_column": "app_id", "data_type": "int"},
               {"xml_path": "/Provenir/Request", "xml_attribute": "x", "target_table": "app_base",
                "target_column": "x", "data_type": "int"},
               {"xml_path": "/Provenir/Request", "xml_attribute": "x", "target_table": "app_base",
                "target_column": "X", "data_type": "int"},
               {"xml_path": "/Provenir/Request", "target_table": "app_base", "target_column": "calc",
                "data_type": "int", "mapping_type": "calculated_field", "expression": "CASE WHEN"},
               {"xml_path": "/Provenir/Request", "xml_attribute": "s", "target_table": "app_base",
                "target_column": "status_code", "data_type": "int", "mapping_type": "enum"}"#,
        );
        let err = load_contract_str(&raw).unwrap_err();
        let codes: HashSet<_> = err.findings().iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(codes::CODE_PATH_NOT_ROOTED));
        assert!(codes.contains(codes::CODE_DUPLICATE_MAPPING));
        assert!(codes.contains(codes::CODE_EXPRESSION_INVALID));
        assert!(codes.contains(codes::CODE_ENUM_MISSING));
    }

    #[test]
    fn test_critical_enum_default_is_rejected() {
        let raw = contract_json("").replace(
            r#""contact_type_enum": {"PR": 281, "AUTHU": 280}"#,
            r#""contact_type_enum": {"PR": 281, "": 0}"#,
        );
        let err = load_contract_str(&raw).unwrap_err();
        assert!(
            err.findings()
                .iter()
                .any(|f| f.code == codes::CODE_CRITICAL_ENUM_DEFAULT)
        );
    }

    #[test]
    fn test_key_value_mapping_must_target_key_value_table() {
        let raw = contract_json(
            r#"{"xml_path": "/Provenir/Request/CustApp/scores", "xml_attribute": "score",
                "target_table": "app_base", "target_column": "score", "data_type": "int",
                "mapping_type": "add_score(FICO)"}"#,
        );
        let err = load_contract_str(&raw).unwrap_err();
        assert_eq!(err.findings()[0].code, codes::CODE_KEY_VALUE_TABLE);
    }

    #[test]
    fn test_missing_file() {
        let err = load_contract(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ContractError::Io { .. }));
    }
}
