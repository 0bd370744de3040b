use crate::contract::tables::TargetTable;
use serde::{Deserialize, Serialize};

/// Values that never count as present in a slot attribute, compared after trimming.
pub const EMPTY_SENTINELS: [&str; 6] = ["", "0", "0.00", "0.0", "None", "MISSING"];

/// True when a raw attribute value carries real data.
pub fn is_meaningful(raw: &str) -> bool {
    !EMPTY_SENTINELS.contains(&raw.trim())
}

/// How contacts and their child elements are located and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementFiltering {
    pub contact_path: String,
    pub contact_id_attribute: String,
    pub role_attribute: String,
    pub allowed_roles: Vec<String>,
    pub primary_role: String,
    pub address_element: String,
    pub address_type_attribute: String,
    pub current_address_type: String,
    pub employment_element: String,
    pub employment_type_attribute: String,
}

impl Default for ElementFiltering {
    fn default() -> Self {
        Self {
            contact_path: "/Provenir/Request/CustApp/contact".into(),
            contact_id_attribute: "con_id".into(),
            role_attribute: "ac_role_tp_c".into(),
            allowed_roles: vec!["PR".into(), "AUTHU".into()],
            primary_role: "PR".into(),
            address_element: "contact_address".into(),
            address_type_attribute: "address_tp_c".into(),
            current_address_type: "CURR".into(),
            employment_element: "contact_employment".into(),
            employment_type_attribute: "employment_tp_c".into(),
        }
    }
}

impl ElementFiltering {
    pub fn is_allowed_role(&self, role: &str) -> bool {
        let role = role.trim();
        self.allowed_roles.iter().any(|r| r == role)
    }

    /// Child element name feeding a contact child table.
    pub fn child_element(&self, table: TargetTable) -> Option<&str> {
        match table {
            TargetTable::ContactAddress => Some(&self.address_element),
            TargetTable::ContactEmployment => Some(&self.employment_element),
            _ => None,
        }
    }
}

/// A family of numbered attribute groups on one element, such as
/// `coll1_*` .. `coll4_*` on the collateral element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGroup {
    pub target_table: TargetTable,
    pub xml_path: String,

    /// Prefix template; `{n}` is replaced by the slot number.
    pub attribute_prefix: String,

    pub slots: Vec<u32>,

    /// Attribute suffixes that never make a slot present on their own.
    #[serde(default)]
    pub ignored_suffixes: Vec<String>,

    /// Column receiving the slot number, if any.
    #[serde(default)]
    pub slot_column: Option<String>,
}

impl SlotGroup {
    pub fn prefix(&self, slot: u32) -> String {
        self.attribute_prefix.replace("{n}", &slot.to_string())
    }

    /// Whether any non-ignored attribute of the slot carries a meaningful value.
    pub fn slot_present<'a, I>(&self, slot: u32, attributes: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let prefix = self.prefix(slot);
        attributes.into_iter().any(|(name, value)| {
            name.strip_prefix(prefix.as_str()).is_some_and(|suffix| {
                !self.ignored_suffixes.iter().any(|s| s == suffix) && is_meaningful(value)
            })
        })
    }
}

/// Parent/child pair whose child rows carry the parent's key in `foreign_key_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub parent_table: TargetTable,
    pub child_table: TargetTable,
    pub foreign_key_column: String,
    #[serde(default)]
    pub xml_parent_path: Option<String>,
    #[serde(default)]
    pub xml_child_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collateral() -> SlotGroup {
        SlotGroup {
            target_table: TargetTable::AppCollateral,
            xml_path: "/Provenir/Request/CustApp/application/collateral".into(),
            attribute_prefix: "coll{n}_".into(),
            slots: vec![1, 2, 3, 4],
            ignored_suffixes: vec!["new_used_demo".into()],
            slot_column: Some("sort_order".into()),
        }
    }

    #[test]
    fn sentinels_are_not_meaningful() {
        for raw in ["", " ", "0", "0.00", "0.0", "None", "MISSING", " 0 "] {
            assert!(!is_meaningful(raw), "{raw:?}");
        }
        for raw in ["1", "0.01", "none", "U", "00"] {
            assert!(is_meaningful(raw), "{raw:?}");
        }
    }

    #[test]
    fn ignored_suffix_alone_does_not_create_slot() {
        let group = collateral();
        assert!(!group.slot_present(1, [("coll1_new_used_demo", "U")]));
        assert!(group.slot_present(1, [("coll1_new_used_demo", "U"), ("coll1_year", "2020")]));
    }

    #[test]
    fn other_slots_do_not_leak() {
        let group = collateral();
        assert!(!group.slot_present(1, [("coll2_year", "2020")]));
        assert!(!group.slot_present(1, [("coll1_value", "0.00")]));
    }

    #[test]
    fn allowed_roles_are_trimmed() {
        let f = ElementFiltering::default();
        assert!(f.is_allowed_role(" PR"));
        assert!(f.is_allowed_role("AUTHU"));
        assert!(!f.is_allowed_role("SEC"));
    }
}
