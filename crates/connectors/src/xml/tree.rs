use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub type NodeId = usize;

/// One element of a parsed document. Names are namespace-local.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Path with a `[i]` suffix on every segment whose siblings repeat.
    pub path: String,
    /// Path without repetition indexes.
    pub plain_path: String,
}

/// Flattened view of one element, keyed by its indexed path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatElement {
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub children: Vec<String>,
}

/// Arena-backed element tree. Node ids follow document order, so every
/// lookup that returns several nodes returns them in document order.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
    by_plain_path: HashMap<String, Vec<NodeId>>,
    by_path: HashMap<String, NodeId>,
}

impl XmlTree {
    /// Builds the path indexes over a node arena whose first entry is the root.
    pub(crate) fn from_nodes(mut nodes: Vec<XmlNode>) -> Self {
        assign_paths(&mut nodes);

        let mut by_plain_path: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut by_path = HashMap::with_capacity(nodes.len());
        for (id, node) in nodes.iter().enumerate() {
            by_plain_path
                .entry(node.plain_path.clone())
                .or_default()
                .push(id);
            by_path.insert(node.path.clone(), id);
        }

        Self {
            nodes,
            by_plain_path,
            by_path,
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements at `path`. Plain paths match every repetition; an
    /// indexed path matches exactly one element.
    pub fn elements_at(&self, path: &str) -> Vec<NodeId> {
        let path = normalize(path);
        if let Some(ids) = self.by_plain_path.get(path) {
            return ids.clone();
        }
        self.by_path.get(path).map(|id| vec![*id]).unwrap_or_default()
    }

    pub fn first_at(&self, path: &str) -> Option<NodeId> {
        let path = normalize(path);
        self.by_plain_path
            .get(path)
            .and_then(|ids| ids.first().copied())
            .or_else(|| self.by_path.get(path).copied())
    }

    /// Every element named `name`, anywhere in the document.
    pub fn find_descendants(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Attribute lookup; an exact name match is preferred over a
    /// case-insensitive one.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let attrs = &self.nodes[id].attributes;
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| attrs.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        &self.nodes[id].attributes
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        let text = self.nodes[id].text.as_str();
        (!text.is_empty()).then_some(text)
    }

    pub fn children_named<'a>(&'a self, id: NodeId, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |c| self.nodes[*c].name == name)
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, |p| self.nodes[*p].parent)
    }

    /// Indexed path of every element mapped to its attributes, text and
    /// child paths.
    pub fn flatten(&self) -> BTreeMap<String, FlatElement> {
        self.nodes
            .iter()
            .map(|node| {
                let element = FlatElement {
                    attributes: node.attributes.iter().cloned().collect(),
                    text: (!node.text.is_empty()).then(|| node.text.clone()),
                    children: node
                        .children
                        .iter()
                        .map(|c| self.nodes[*c].path.clone())
                        .collect(),
                };
                (node.path.clone(), element)
            })
            .collect()
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => path,
        trimmed => trimmed,
    }
}

/// Fills `path` and `plain_path` top-down. Repetition indexes are 0-based
/// and only appear where a parent has more than one child of that name.
fn assign_paths(nodes: &mut [XmlNode]) {
    if nodes.is_empty() {
        return;
    }
    nodes[0].path = format!("/{}", nodes[0].name);
    nodes[0].plain_path = nodes[0].path.clone();

    let mut pending = vec![0];
    while let Some(parent) = pending.pop() {
        let children = nodes[parent].children.clone();
        let mut totals: HashMap<String, usize> = HashMap::new();
        for c in &children {
            *totals.entry(nodes[*c].name.clone()).or_default() += 1;
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for c in children {
            let name = nodes[c].name.clone();
            let segment = if totals.get(&name).copied().unwrap_or(0) > 1 {
                let index = seen.entry(name.clone()).or_default();
                let seg = format!("{name}[{index}]");
                *index += 1;
                seg
            } else {
                name.clone()
            };
            nodes[c].path = format!("{}/{}", nodes[parent].path, segment);
            nodes[c].plain_path = format!("{}/{}", nodes[parent].plain_path, name);
            pending.push(c);
        }
    }
}
