use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Source string -> integer code for one enum type.
///
/// An entry under the empty-string key is the enum's declared default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumTable(pub BTreeMap<String, i64>);

impl EnumTable {
    pub fn get(&self, raw: &str) -> Option<i64> {
        self.0
            .get(raw)
            .or_else(|| self.0.get(raw.trim()))
            .copied()
    }

    pub fn default_value(&self) -> Option<i64> {
        self.0.get("").copied()
    }

    /// Exact match, then trimmed match, then the declared default.
    pub fn lookup(&self, raw: Option<&str>) -> Option<i64> {
        raw.and_then(|r| self.get(r)).or_else(|| self.default_value())
    }
}

/// Which bit-conversion table a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitKind {
    Char,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitConversions {
    #[serde(default = "default_char_to_bit")]
    pub char_to_bit: HashMap<String, i64>,
    #[serde(default = "default_boolean_to_bit")]
    pub boolean_to_bit: HashMap<String, i64>,
}

impl Default for BitConversions {
    fn default() -> Self {
        Self {
            char_to_bit: default_char_to_bit(),
            boolean_to_bit: default_boolean_to_bit(),
        }
    }
}

impl BitConversions {
    /// Always yields 0 or 1: blank, `null` and unmapped input become 0.
    pub fn convert(&self, kind: BitKind, raw: Option<&str>) -> i64 {
        let table = match kind {
            BitKind::Char => &self.char_to_bit,
            BitKind::Boolean => &self.boolean_to_bit,
        };

        let Some(raw) = raw else {
            return 0;
        };

        let hit = table
            .get(raw)
            .or_else(|| table.get(raw.trim()))
            .or_else(|| {
                let folded = raw.trim().to_ascii_lowercase();
                table
                    .iter()
                    .find(|(k, _)| k.to_ascii_lowercase() == folded)
                    .map(|(_, v)| v)
            })
            .copied();

        match hit {
            Some(bit) if bit != 0 => 1,
            _ => 0,
        }
    }
}

fn default_char_to_bit() -> HashMap<String, i64> {
    [("Y", 1), ("N", 0), ("", 0), ("null", 0), (" ", 0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_boolean_to_bit() -> HashMap<String, i64> {
    [
        ("true", 1),
        ("false", 0),
        ("1", 1),
        ("0", 0),
        ("Y", 1),
        ("N", 0),
        ("", 0),
        ("null", 0),
        (" ", 0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
