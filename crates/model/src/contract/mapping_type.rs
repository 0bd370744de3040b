use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt, str::FromStr};

/// One transformation stage of a field mapping.
///
/// Contracts spell these as string tags (`"enum"`, `"add_score(TU_TRIGGER)"`);
/// parsing into this closed set happens once, at contract load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingType {
    IdentityInsert,
    Enum,
    CharToBit,
    BooleanToBit,
    NumbersOnly,
    ExtractNumeric,
    CalculatedField,
    CurrAddressOnly,
    LastValidPrContact,
    DefaultGetUtcDateIfNull,
    AddScore { identifier: String },
    AddIndicator { identifier: String },
    AddHistory,
    Trim,
    Upper,
    Lower,
}

/// Destination of a key-value mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyValueKind {
    Score,
    Indicator,
    History,
}

impl MappingType {
    /// Stages that choose the source element instead of transforming a value.
    pub fn is_source_selector(&self) -> bool {
        matches!(
            self,
            MappingType::CurrAddressOnly | MappingType::LastValidPrContact
        )
    }

    pub fn key_value(&self) -> Option<(KeyValueKind, Option<&str>)> {
        match self {
            MappingType::AddScore { identifier } => {
                Some((KeyValueKind::Score, Some(identifier.as_str())))
            }
            MappingType::AddIndicator { identifier } => {
                Some((KeyValueKind::Indicator, Some(identifier.as_str())))
            }
            MappingType::AddHistory => Some((KeyValueKind::History, None)),
            _ => None,
        }
    }

    pub fn tag(&self) -> String {
        match self {
            MappingType::IdentityInsert => "identity_insert".into(),
            MappingType::Enum => "enum".into(),
            MappingType::CharToBit => "char_to_bit".into(),
            MappingType::BooleanToBit => "boolean_to_bit".into(),
            MappingType::NumbersOnly => "numbers_only".into(),
            MappingType::ExtractNumeric => "extract_numeric".into(),
            MappingType::CalculatedField => "calculated_field".into(),
            MappingType::CurrAddressOnly => "curr_address_only".into(),
            MappingType::LastValidPrContact => "last_valid_pr_contact".into(),
            MappingType::DefaultGetUtcDateIfNull => "default_getutcdate_if_null".into(),
            MappingType::AddScore { identifier } => format!("add_score({identifier})"),
            MappingType::AddIndicator { identifier } => format!("add_indicator({identifier})"),
            MappingType::AddHistory => "add_history".into(),
            MappingType::Trim => "trim".into(),
            MappingType::Upper => "upper".into(),
            MappingType::Lower => "lower".into(),
        }
    }
}

impl FromStr for MappingType {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let tag = tag.trim();
        let (name, param) = match tag.find('(') {
            Some(open) if tag.ends_with(')') => {
                let param = tag[open + 1..tag.len() - 1].trim();
                (&tag[..open], Some(param))
            }
            Some(_) => return Err(format!("malformed mapping type '{tag}'")),
            None => (tag, None),
        };

        let require_param = |kind: &str| -> Result<String, String> {
            match param {
                Some(p) if !p.is_empty() => Ok(p.to_string()),
                _ => Err(format!("mapping type '{kind}' requires an identifier")),
            }
        };

        let parsed = match name.trim().to_ascii_lowercase().as_str() {
            "identity_insert" => MappingType::IdentityInsert,
            "enum" => MappingType::Enum,
            "char_to_bit" => MappingType::CharToBit,
            "boolean_to_bit" => MappingType::BooleanToBit,
            "numbers_only" => MappingType::NumbersOnly,
            "extract_numeric" => MappingType::ExtractNumeric,
            "calculated_field" => MappingType::CalculatedField,
            "curr_address_only" => MappingType::CurrAddressOnly,
            "last_valid_pr_contact" => MappingType::LastValidPrContact,
            "default_getutcdate_if_null" => MappingType::DefaultGetUtcDateIfNull,
            "add_score" => MappingType::AddScore {
                identifier: require_param("add_score")?,
            },
            "add_indicator" => MappingType::AddIndicator {
                identifier: require_param("add_indicator")?,
            },
            "add_history" => MappingType::AddHistory,
            "trim" => MappingType::Trim,
            "upper" => MappingType::Upper,
            "lower" => MappingType::Lower,
            other => return Err(format!("unsupported mapping type '{other}'")),
        };

        if param.is_some() && parsed.key_value().is_none_or(|(_, id)| id.is_none()) {
            return Err(format!("mapping type '{name}' takes no parameter"));
        }

        Ok(parsed)
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl Serialize for MappingType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for MappingType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Accepts `null`, a single tag, a comma separated chain (`"enum, char_to_bit"`)
/// or an array of tags. Top-level commas inside parentheses are not split.
pub fn deserialize_chain<'de, D>(deserializer: D) -> Result<Vec<MappingType>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    let tags = match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::One(s)) => split_chain(&s),
        Some(Raw::Many(v)) => v.iter().flat_map(|s| split_chain(s)).collect(),
    };

    tags.iter()
        .map(|t| t.parse::<MappingType>().map_err(de::Error::custom))
        .collect()
}

/// Splits a comma separated tag chain, keeping commas inside parentheses.
pub fn split_chain(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for ch in raw.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameterised_tags() {
        assert_eq!(
            "add_score(TU_TRIGGER)".parse::<MappingType>(),
            Ok(MappingType::AddScore {
                identifier: "TU_TRIGGER".into()
            })
        );
        assert_eq!(
            " ADD_INDICATOR( Rushed ) ".parse::<MappingType>(),
            Ok(MappingType::AddIndicator {
                identifier: "Rushed".into()
            })
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_tags() {
        assert!("to_json".parse::<MappingType>().is_err());
        assert!("add_score".parse::<MappingType>().is_err());
        assert!("add_score()".parse::<MappingType>().is_err());
        assert!("enum(x)".parse::<MappingType>().is_err());
        assert!("add_score(x".parse::<MappingType>().is_err());
    }

    #[test]
    fn chain_accepts_string_and_array_forms() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "deserialize_chain")]
            mapping_type: Vec<MappingType>,
        }

        let a: Holder = serde_json::from_str(r#"{"mapping_type": "enum, char_to_bit"}"#).unwrap();
        let b: Holder =
            serde_json::from_str(r#"{"mapping_type": ["enum", "char_to_bit"]}"#).unwrap();
        let c: Holder = serde_json::from_str(r#"{"mapping_type": null}"#).unwrap();
        let d: Holder = serde_json::from_str(r#"{}"#).unwrap();

        assert_eq!(a.mapping_type, vec![MappingType::Enum, MappingType::CharToBit]);
        assert_eq!(a.mapping_type, b.mapping_type);
        assert!(c.mapping_type.is_empty());
        assert!(d.mapping_type.is_empty());
    }

    #[test]
    fn chain_keeps_parameters_with_commas_intact() {
        assert_eq!(
            split_chain("add_score(A,B), trim"),
            vec!["add_score(A,B)".to_string(), "trim".to_string()]
        );
    }
}
