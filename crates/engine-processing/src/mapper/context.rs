use chrono::NaiveDateTime;
use connectors::xml::{NodeId, XmlTree};
use expression_engine::EvalContext;
use model::MappingContract;

/// A slot being mapped: its number and the attribute prefix it owns.
#[derive(Debug, Clone)]
pub struct SlotBinding {
    pub number: u32,
    pub prefix: String,
}

/// Per-document lookup state shared by every table of one mapping run.
pub struct DocumentContext<'a> {
    pub tree: &'a XmlTree,
    pub now: NaiveDateTime,
    scopes: Vec<(&'a str, NodeId)>,
}

impl<'a> DocumentContext<'a> {
    pub fn new(tree: &'a XmlTree, contract: &'a MappingContract, now: NaiveDateTime) -> Self {
        let scopes = contract
            .expression_scopes
            .iter()
            .filter_map(|(alias, path)| tree.first_at(path).map(|id| (alias.as_str(), id)))
            .collect();
        Self { tree, now, scopes }
    }

    /// Expression context for `node`: ancestors qualified by element name,
    /// then scope aliases, then the element itself (plain and qualified).
    /// Later entries win on name clashes.
    pub fn element_context(&self, node: Option<NodeId>, slot: Option<&SlotBinding>) -> EvalContext {
        let tree = self.tree;
        let mut ctx = EvalContext::new(self.now);

        if let Some(node) = node {
            let mut ancestors: Vec<NodeId> = tree.ancestors(node).collect();
            ancestors.reverse();
            for id in ancestors {
                ctx.insert_scope(&tree.node(id).name, pairs(tree, id), false);
            }
        }

        for (alias, id) in &self.scopes {
            ctx.insert_scope(alias, pairs(tree, *id), false);
        }

        if let Some(node) = node {
            ctx.insert_scope(&tree.node(node).name, pairs(tree, node), true);

            if let Some(slot) = slot {
                for (name, value) in pairs(tree, node) {
                    if let Some(stripped) = name.strip_prefix(slot.prefix.as_str()) {
                        ctx.insert(stripped, value);
                    }
                }
            }
        }

        ctx
    }

    /// Finds the element for `path` relative to `anchor`: the anchor itself,
    /// a descendant below it, or one of its ancestors. Anything else is a
    /// document-wide lookup.
    pub fn resolve_node(&self, path: &str, anchor: Option<NodeId>) -> Option<NodeId> {
        let tree = self.tree;
        let path = path.trim_end_matches('/');

        if let Some(anchor) = anchor {
            let anchor_path = tree.node(anchor).plain_path.as_str();
            if anchor_path == path {
                return Some(anchor);
            }
            if let Some(rest) = path
                .strip_prefix(anchor_path)
                .and_then(|r| r.strip_prefix('/'))
            {
                return rest
                    .split('/')
                    .try_fold(anchor, |node, segment| tree.children_named(node, segment).next());
            }
            if let Some(ancestor) = tree
                .ancestors(anchor)
                .find(|id| tree.node(*id).plain_path == path)
            {
                return Some(ancestor);
            }
        }

        tree.first_at(path)
    }

    /// Attribute value, or the element text when no attribute is named.
    pub fn read(&self, node: NodeId, attribute: Option<&str>) -> Option<String> {
        match attribute {
            Some(name) => self.tree.attribute(node, name).map(str::to_string),
            None => self.tree.text(node).map(str::to_string),
        }
    }
}

fn pairs(tree: &XmlTree, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
    tree.attributes(id)
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::xml::XmlParser;

    const XML: &str = r#"
        <Provenir>
          <Request ID="9">
            <CustApp>
              <application population_assignment="CM" status="A">
                <collateral coll1_year="2020" coll2_year="2018"/>
              </application>
              <contact con_id="1" first_name="Ann">
                <contact_address city="Fargo"/>
              </contact>
            </CustApp>
          </Request>
        </Provenir>"#;

    fn contract() -> MappingContract {
        MappingContract::from_json(
            r#"{
                "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
                "mappings": [],
                "expression_scopes": {"app": "/Provenir/Request/CustApp/application"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_context_layers() {
        let tree = XmlParser.parse(XML).unwrap();
        let contract = contract();
        let doc = DocumentContext::new(&tree, &contract, NaiveDateTime::default());

        let address = tree.find_descendants("contact_address")[0];
        let ctx = doc.element_context(Some(address), None);

        assert_eq!(ctx.get("city"), Some("Fargo"));
        assert_eq!(ctx.get("contact_address.city"), Some("Fargo"));
        assert_eq!(ctx.get("contact.first_name"), Some("Ann"));
        assert_eq!(ctx.get("Request.ID"), Some("9"));
        assert_eq!(ctx.get("app.population_assignment"), Some("CM"));
        assert_eq!(ctx.get("first_name"), None);
    }

    #[test]
    fn test_slot_attributes_are_unprefixed() {
        let tree = XmlParser.parse(XML).unwrap();
        let contract = contract();
        let doc = DocumentContext::new(&tree, &contract, NaiveDateTime::default());

        let collateral = tree.find_descendants("collateral")[0];
        let slot = SlotBinding {
            number: 2,
            prefix: "coll2_".into(),
        };
        let ctx = doc.element_context(Some(collateral), Some(&slot));
        assert_eq!(ctx.get("year"), Some("2018"));
        assert_eq!(ctx.get("coll1_year"), Some("2020"));
    }

    #[test]
    fn test_resolution_relative_to_anchor() {
        let tree = XmlParser.parse(XML).unwrap();
        let contract = contract();
        let doc = DocumentContext::new(&tree, &contract, NaiveDateTime::default());

        let contact = tree.find_descendants("contact")[0];
        let address = tree.find_descendants("contact_address")[0];
        let base = "/Provenir/Request/CustApp";

        assert_eq!(doc.resolve_node(&format!("{base}/contact"), Some(contact)), Some(contact));
        assert_eq!(
            doc.resolve_node(&format!("{base}/contact/contact_address"), Some(contact)),
            Some(address)
        );
        assert_eq!(doc.resolve_node(&format!("{base}/contact"), Some(address)), Some(contact));
        assert_eq!(
            doc.resolve_node(&format!("{base}/application"), Some(contact)),
            tree.find_descendants("application").first().copied()
        );
        assert_eq!(doc.resolve_node(&format!("{base}/missing"), None), None);
        assert_eq!(doc.read(contact, Some("first_name")).as_deref(), Some("Ann"));
    }
}
