use crate::{
    contract::{
        mapping_type::{KeyValueKind, MappingType, deserialize_chain},
        tables::TargetTable,
    },
    core::data_type::DataType,
};
use serde::{Deserialize, Serialize};

/// What a mapping produces when its pipeline ends without a value and no
/// `default_value` is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullFallback {
    /// Leave the column out of the row (inserted as NULL).
    Null,
    /// Write an empty string.
    EmptyString,
    /// Drop the whole row.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub xml_path: String,

    /// `None` reads the element's text content.
    #[serde(default)]
    pub xml_attribute: Option<String>,

    pub target_table: TargetTable,
    pub target_column: String,
    pub data_type: DataType,

    #[serde(default, deserialize_with = "deserialize_chain")]
    pub mapping_type: Vec<MappingType>,

    #[serde(default)]
    pub expression: Option<String>,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default_value: Option<serde_json::Value>,

    #[serde(default)]
    pub data_length: Option<usize>,

    /// Explicit enum table; otherwise derived from `target_column`.
    #[serde(default)]
    pub enum_type: Option<String>,

    #[serde(default)]
    pub else_fallback: Option<NullFallback>,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FieldMapping {
    pub fn has(&self, ty: &MappingType) -> bool {
        self.mapping_type.contains(ty)
    }

    pub fn key_value(&self) -> Option<(KeyValueKind, Option<&str>)> {
        self.mapping_type.iter().find_map(|t| t.key_value())
    }

    /// `*_enum` is used as-is, `*_code` maps to `*_enum`.
    pub fn enum_name(&self) -> String {
        if let Some(name) = &self.enum_type {
            return name.clone();
        }
        let column = self.target_column.as_str();
        if column.ends_with("_enum") {
            column.to_string()
        } else if let Some(stem) = column.strip_suffix("_code") {
            format!("{stem}_enum")
        } else {
            format!("{column}_enum")
        }
    }

    /// Textual form of `default_value`, with JSON `null` treated as absent.
    pub fn default_text(&self) -> Option<String> {
        match &self.default_value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Explicit fallback, or derived from nullability: nullable columns stay
    /// NULL, non-nullable text columns get an empty string, everything else
    /// drops the row.
    pub fn null_fallback(&self) -> NullFallback {
        if let Some(f) = self.else_fallback {
            return f;
        }
        if self.nullable {
            NullFallback::Null
        } else if self.data_type.is_text() {
            NullFallback::EmptyString
        } else {
            NullFallback::Skip
        }
    }

    /// Identity of a mapping for duplicate detection.
    pub fn signature(&self) -> (String, String, TargetTable, String) {
        (
            self.xml_path.clone(),
            self.xml_attribute.clone().unwrap_or_default(),
            self.target_table,
            self.target_column.to_ascii_lowercase(),
        )
    }
}
