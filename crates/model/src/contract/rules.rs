use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a named key (`app_id`, `con_id_primary`, ...) lives in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIdentifier {
    pub xml_path: String,
    pub xml_attribute: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl NumericRange {
    pub fn contains(&self, value: i64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default = "default_required_identifiers")]
    pub required_identifiers: Vec<String>,

    /// Inclusive bounds for numeric key identifiers, keyed by identifier name.
    #[serde(default)]
    pub ranges: BTreeMap<String, NumericRange>,

    /// Reject documents with no contact passing the role filter.
    #[serde(default = "default_require_valid_contact")]
    pub require_valid_contact: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_identifiers: default_required_identifiers(),
            ranges: BTreeMap::new(),
            require_valid_contact: default_require_valid_contact(),
        }
    }
}

fn default_required_identifiers() -> Vec<String> {
    vec!["app_id".to_string()]
}

fn default_require_valid_contact() -> bool {
    true
}
