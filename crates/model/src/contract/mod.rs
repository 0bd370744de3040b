pub mod field;
pub mod filtering;
pub mod lookup;
pub mod mapping_type;
pub mod rules;
pub mod tables;

use field::FieldMapping;
use filtering::{ElementFiltering, Relationship, SlotGroup};
use lookup::{BitConversions, EnumTable};
use rules::{KeyIdentifier, ValidationRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tables::TargetTable;

/// Declarative description of how one product line's XML maps onto the
/// relational schema. Loaded once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingContract {
    pub source_table: String,
    pub source_column: String,
    pub xml_root_element: String,

    #[serde(default = "default_schema")]
    pub target_schema: String,

    #[serde(default)]
    pub key_identifiers: BTreeMap<String, KeyIdentifier>,

    #[serde(default)]
    pub element_filtering: ElementFiltering,

    pub mappings: Vec<FieldMapping>,

    #[serde(default)]
    pub enum_mappings: BTreeMap<String, EnumTable>,

    #[serde(default = "default_critical_enums")]
    pub critical_enums: Vec<String>,

    #[serde(default)]
    pub bit_conversions: BitConversions,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    #[serde(default)]
    pub validation_rules: ValidationRules,

    #[serde(default)]
    pub expression_scopes: BTreeMap<String, String>,

    #[serde(default)]
    pub slot_groups: Vec<SlotGroup>,

    #[serde(default)]
    pub table_insertion_order: Option<Vec<TargetTable>>,
}

fn default_schema() -> String {
    "dbo".to_string()
}

fn default_critical_enums() -> Vec<String> {
    vec![
        "contact_type_enum".into(),
        "address_type_enum".into(),
        "employment_type_enum".into(),
    ]
}

impl MappingContract {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// `/` followed by the declared root element.
    pub fn root_path(&self) -> String {
        format!("/{}", self.xml_root_element)
    }

    pub fn insertion_order(&self) -> Vec<TargetTable> {
        match &self.table_insertion_order {
            Some(order) if !order.is_empty() => order.clone(),
            _ => TargetTable::DEFAULT_INSERTION_ORDER.to_vec(),
        }
    }

    pub fn mappings_for(&self, table: TargetTable) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(move |m| m.target_table == table)
    }

    /// Tables with at least one mapping, in insertion order.
    pub fn target_tables(&self) -> Vec<TargetTable> {
        self.insertion_order()
            .into_iter()
            .filter(|t| self.mappings.iter().any(|m| m.target_table == *t))
            .collect()
    }

    pub fn enum_table(&self, name: &str) -> Option<&EnumTable> {
        self.enum_mappings.get(name)
    }

    pub fn is_critical_enum(&self, name: &str) -> bool {
        self.critical_enums.iter().any(|c| c == name)
    }

    pub fn slot_group(&self, table: TargetTable) -> Option<&SlotGroup> {
        self.slot_groups.iter().find(|g| g.target_table == table)
    }

    pub fn relationship_for(&self, child: TargetTable) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.child_table == child)
    }

    pub fn key_identifier(&self, name: &str) -> Option<&KeyIdentifier> {
        self.key_identifiers.get(name)
    }

    pub fn qualified_table_name(&self, table: TargetTable) -> String {
        format!("[{}].[{}]", self.target_schema, table.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "source_table": "app_xml",
        "source_column": "xml",
        "xml_root_element": "Provenir",
        "mappings": [
            {"xml_path": "/Provenir/Request", "xml_attribute": "ID",
             "target_table": "app_base", "target_column": "app_id",
             "data_type": "int", "mapping_type": "identity_insert"},
            {"xml_path": "/Provenir/Request/CustApp/contact", "xml_attribute": "first_name",
             "target_table": "contact_base", "target_column": "first_name",
             "data_type": "varchar(50)"}
        ],
        "enum_mappings": {"app_type_enum": {"PRODB": 30}}
    }"#;

    #[test]
    fn minimal_contract_fills_defaults() {
        let c = MappingContract::from_json(MINIMAL).unwrap();
        assert_eq!(c.root_path(), "/Provenir");
        assert_eq!(c.target_schema, "dbo");
        assert!(c.is_critical_enum("address_type_enum"));
        assert_eq!(c.enum_table("app_type_enum").and_then(|t| t.get("PRODB")), Some(30));
        assert_eq!(c.element_filtering.primary_role, "PR");
        assert_eq!(
            c.target_tables(),
            vec![TargetTable::AppBase, TargetTable::ContactBase]
        );
    }

    #[test]
    fn insertion_order_override() {
        let mut c = MappingContract::from_json(MINIMAL).unwrap();
        c.table_insertion_order = Some(vec![TargetTable::ContactBase, TargetTable::AppBase]);
        assert_eq!(
            c.target_tables(),
            vec![TargetTable::ContactBase, TargetTable::AppBase]
        );
        assert_eq!(c.qualified_table_name(TargetTable::AppBase), "[dbo].[app_base]");
    }
}
