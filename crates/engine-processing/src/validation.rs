use connectors::xml::{NodeId, XmlError, XmlParser, XmlTree};
use model::{MappingContract, contract::filtering::ElementFiltering};
use serde::Serialize;
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

/// A contact element that passed the role filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidContact {
    pub con_id: String,
    pub role: String,
    /// Position of the element in the tree the validator parsed.
    pub node: NodeId,
}

impl ValidContact {
    pub fn is_primary(&self, filtering: &ElementFiltering) -> bool {
        self.role == filtering.primary_role
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub record_id: String,
    pub is_valid: bool,
    pub can_process: bool,
    pub app_id: Option<i64>,
    pub valid_contacts: Vec<ValidContact>,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
    /// Set when the document is not well-formed XML.
    #[serde(skip)]
    pub parse_error: Option<XmlError>,
}

impl ValidationResult {
    fn new(record_id: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            is_valid: false,
            can_process: false,
            app_id: None,
            valid_contacts: Vec::new(),
            validation_errors: Vec::new(),
            validation_warnings: Vec::new(),
            parse_error: None,
        }
    }

    fn finish(mut self) -> Self {
        self.is_valid = self.validation_errors.is_empty();
        self.can_process = self.is_valid && self.app_id.is_some();
        self
    }

    pub fn primary_contact(&self, filtering: &ElementFiltering) -> Option<&ValidContact> {
        self.valid_contacts
            .iter()
            .rev()
            .find(|c| c.is_primary(filtering))
    }
}

/// Gatekeeper run before mapping. Never fails: every problem is reported in
/// the returned [`ValidationResult`].
#[derive(Debug, Clone)]
pub struct Validator {
    contract: Arc<MappingContract>,
    parser: XmlParser,
}

impl Validator {
    pub fn new(contract: Arc<MappingContract>) -> Self {
        Self {
            contract,
            parser: XmlParser,
        }
    }

    pub fn validate(&self, xml: &str, record_id: &str) -> ValidationResult {
        self.validate_document(xml, record_id).0
    }

    /// Like [`validate`](Self::validate), also handing back the parsed tree
    /// so callers do not parse twice. Contact node ids refer to that tree.
    pub fn validate_document(
        &self,
        xml: &str,
        record_id: &str,
    ) -> (ValidationResult, Option<XmlTree>) {
        let mut result = ValidationResult::new(record_id);

        if xml.trim().is_empty() {
            result.validation_errors.push(XmlError::Empty.to_string());
            return (result.finish(), None);
        }

        match self.parser.parse(xml) {
            Ok(tree) => {
                let result = self.validate_tree(&tree, record_id);
                (result, Some(tree))
            }
            Err(err) => {
                debug!(record_id, error = %err, "Rejected malformed XML");
                result.validation_errors.push(err.to_string());
                result.parse_error = Some(err);
                (result.finish(), None)
            }
        }
    }

    pub fn validate_tree(&self, tree: &XmlTree, record_id: &str) -> ValidationResult {
        let mut result = ValidationResult::new(record_id);
        let contract = &self.contract;

        let root = &tree.node(tree.root()).name;
        if *root != contract.xml_root_element {
            result.validation_errors.push(format!(
                "Root element is <{root}>, expected <{}>",
                contract.xml_root_element
            ));
        }

        self.check_identifiers(tree, &mut result);
        self.collect_contacts(tree, &mut result);

        if contract.validation_rules.require_valid_contact && result.valid_contacts.is_empty() {
            result
                .validation_errors
                .push("No valid contacts with an allowed role".to_string());
        }

        let result = result.finish();
        debug!(
            record_id,
            is_valid = result.is_valid,
            contacts = result.valid_contacts.len(),
            errors = result.validation_errors.len(),
            "Validated document"
        );
        result
    }

    fn identifier_value<'t>(&self, tree: &'t XmlTree, name: &str) -> Option<&'t str> {
        let key = self.contract.key_identifier(name)?;
        tree.elements_at(&key.xml_path)
            .into_iter()
            .find_map(|id| tree.attribute(id, &key.xml_attribute))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn check_identifiers(&self, tree: &XmlTree, result: &mut ValidationResult) {
        let contract = &self.contract;
        let required: BTreeSet<&str> = contract
            .validation_rules
            .required_identifiers
            .iter()
            .map(String::as_str)
            .chain(
                contract
                    .key_identifiers
                    .iter()
                    .filter(|(_, k)| k.required)
                    .map(|(name, _)| name.as_str()),
            )
            .collect();

        for name in required {
            match contract.key_identifier(name) {
                None => result
                    .validation_errors
                    .push(format!("Required identifier '{name}' has no extraction rule")),
                Some(key) if self.identifier_value(tree, name).is_none() => {
                    result.validation_errors.push(format!(
                        "Missing required identifier '{name}' ({}@{})",
                        key.xml_path, key.xml_attribute
                    ))
                }
                Some(_) => {}
            }
        }

        if let Some(raw) = self.identifier_value(tree, "app_id") {
            match raw.parse::<i64>() {
                Ok(id) => result.app_id = Some(id),
                Err(_) => result
                    .validation_errors
                    .push(format!("app_id '{raw}' is not numeric")),
            }
        }

        for (name, range) in &contract.validation_rules.ranges {
            let Some(raw) = self.identifier_value(tree, name) else {
                continue;
            };
            match raw.parse::<i64>() {
                Ok(v) if range.contains(v) => {}
                Ok(v) => result.validation_errors.push(format!(
                    "{name} {v} is outside the allowed range [{}, {}]",
                    range.min.map_or("-".to_string(), |m| m.to_string()),
                    range.max.map_or("-".to_string(), |m| m.to_string()),
                )),
                Err(_) if name == "app_id" => {}
                Err(_) => result
                    .validation_errors
                    .push(format!("{name} '{raw}' is not numeric")),
            }
        }
    }

    /// Duplicate contact ids collapse to the last occurrence.
    fn collect_contacts(&self, tree: &XmlTree, result: &mut ValidationResult) {
        let filtering = &self.contract.element_filtering;

        for (index, node) in tree
            .elements_at(&filtering.contact_path)
            .into_iter()
            .enumerate()
        {
            let con_id = tree
                .attribute(node, &filtering.contact_id_attribute)
                .map(str::trim)
                .unwrap_or_default();
            let role = tree
                .attribute(node, &filtering.role_attribute)
                .map(str::trim)
                .unwrap_or_default();

            if con_id.is_empty() {
                result
                    .validation_warnings
                    .push(format!("Contact #{index} has no {}", filtering.contact_id_attribute));
                continue;
            }
            if !filtering.is_allowed_role(role) {
                result.validation_warnings.push(format!(
                    "Contact {con_id} skipped: role '{role}' is not allowed"
                ));
                continue;
            }

            if let Some(pos) = result.valid_contacts.iter().position(|c| c.con_id == con_id) {
                result.valid_contacts.remove(pos);
                result
                    .validation_warnings
                    .push(format!("Duplicate contact {con_id}: keeping the last occurrence"));
            }
            result.valid_contacts.push(ValidContact {
                con_id: con_id.to_string(),
                role: role.to_string(),
                node,
            });
        }
    }
}
