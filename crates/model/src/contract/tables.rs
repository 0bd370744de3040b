use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt, str::FromStr};

/// The fixed set of destination tables a contract may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetTable {
    AppBase,
    AppOperational,
    AppPricing,
    AppTransactional,
    AppSolicited,
    ContactBase,
    ContactAddress,
    ContactEmployment,
    AppCollateral,
    AppWarranty,
    AppPolicyExceptions,
    Scores,
    Indicators,
    AppHistoricalLookup,
}

/// How rows for a table are fanned out of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// One row per document.
    Application,
    /// One row per valid contact.
    Contact,
    /// One row per (contact, child element type).
    ContactChild,
    /// One row per meaningful slot.
    Slot,
    /// One row per identifier found anywhere in the document.
    KeyValue,
}

impl TargetTable {
    /// Parent tables come before their children.
    pub const DEFAULT_INSERTION_ORDER: [TargetTable; 14] = [
        TargetTable::AppBase,
        TargetTable::AppOperational,
        TargetTable::AppPricing,
        TargetTable::AppTransactional,
        TargetTable::AppSolicited,
        TargetTable::ContactBase,
        TargetTable::ContactAddress,
        TargetTable::ContactEmployment,
        TargetTable::AppCollateral,
        TargetTable::AppWarranty,
        TargetTable::AppPolicyExceptions,
        TargetTable::Scores,
        TargetTable::Indicators,
        TargetTable::AppHistoricalLookup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTable::AppBase => "app_base",
            TargetTable::AppOperational => "app_operational",
            TargetTable::AppPricing => "app_pricing",
            TargetTable::AppTransactional => "app_transactional",
            TargetTable::AppSolicited => "app_solicited",
            TargetTable::ContactBase => "contact_base",
            TargetTable::ContactAddress => "contact_address",
            TargetTable::ContactEmployment => "contact_employment",
            TargetTable::AppCollateral => "app_collateral",
            TargetTable::AppWarranty => "app_warranty",
            TargetTable::AppPolicyExceptions => "app_policy_exceptions",
            TargetTable::Scores => "scores",
            TargetTable::Indicators => "indicators",
            TargetTable::AppHistoricalLookup => "app_historical_lookup",
        }
    }

    pub fn scope(&self) -> TableScope {
        match self {
            TargetTable::AppBase
            | TargetTable::AppOperational
            | TargetTable::AppPricing
            | TargetTable::AppTransactional
            | TargetTable::AppSolicited => TableScope::Application,
            TargetTable::ContactBase => TableScope::Contact,
            TargetTable::ContactAddress | TargetTable::ContactEmployment => {
                TableScope::ContactChild
            }
            TargetTable::AppCollateral
            | TargetTable::AppWarranty
            | TargetTable::AppPolicyExceptions => TableScope::Slot,
            TargetTable::Scores | TargetTable::Indicators | TargetTable::AppHistoricalLookup => {
                TableScope::KeyValue
            }
        }
    }

    /// Columns that identify a row within one document.
    pub fn unique_key(&self) -> &'static [&'static str] {
        match self {
            TargetTable::ContactBase => &["con_id"],
            TargetTable::ContactAddress => &["con_id", "address_type_enum"],
            TargetTable::ContactEmployment => &["con_id", "employment_type_enum"],
            _ => &[],
        }
    }
}

impl FromStr for TargetTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        TargetTable::DEFAULT_INSERTION_ORDER
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| format!("unknown target table '{s}'"))
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TargetTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TargetTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for table in TargetTable::DEFAULT_INSERTION_ORDER {
            assert_eq!(table.as_str().parse::<TargetTable>(), Ok(table));
        }
        assert!("app_unknown".parse::<TargetTable>().is_err());
    }

    #[test]
    fn parents_precede_children_in_default_order() {
        let pos = |t: TargetTable| {
            TargetTable::DEFAULT_INSERTION_ORDER
                .iter()
                .position(|x| *x == t)
                .unwrap()
        };
        assert!(pos(TargetTable::AppBase) < pos(TargetTable::ContactBase));
        assert!(pos(TargetTable::ContactBase) < pos(TargetTable::ContactAddress));
        assert!(pos(TargetTable::ContactBase) < pos(TargetTable::ContactEmployment));
    }
}
