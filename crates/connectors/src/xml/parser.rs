use super::{
    error::XmlError,
    tree::{NodeId, XmlNode, XmlTree},
};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::trace;

/// Stateless XML reader producing an [`XmlTree`] per document.
#[derive(Debug, Clone, Default)]
pub struct XmlParser;

impl XmlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, xml: &str) -> Result<XmlTree, XmlError> {
        if xml.trim().is_empty() {
            return Err(XmlError::Empty);
        }

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut nodes: Vec<XmlNode> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Malformed {
                position: reader.error_position(),
                message: e.to_string(),
            })?;

            match event {
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &open, &e, reader.buffer_position())?;
                    open.push(id);
                }
                Event::Empty(e) => {
                    push_element(&mut nodes, &open, &e, reader.buffer_position())?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| XmlError::Malformed {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })?;
                    append_text(&mut nodes, &open, &text, reader.buffer_position())?;
                }
                Event::CData(c) => {
                    let text = std::str::from_utf8(&c).map_err(|e| XmlError::Malformed {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })?;
                    append_text(&mut nodes, &open, text, reader.buffer_position())?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(XmlError::Unclosed(nodes[*unclosed].name.clone()));
        }
        if nodes.is_empty() {
            return Err(XmlError::NoRoot);
        }

        trace!(elements = nodes.len(), "Parsed XML document");
        Ok(XmlTree::from_nodes(nodes))
    }
}

fn push_element(
    nodes: &mut Vec<XmlNode>,
    open: &[NodeId],
    start: &BytesStart<'_>,
    position: u64,
) -> Result<NodeId, XmlError> {
    let parent = open.last().copied();
    if parent.is_none() && !nodes.is_empty() {
        return Err(XmlError::MultipleRoots);
    }

    let malformed = |message: String| XmlError::Malformed { position, message };

    let name = std::str::from_utf8(start.local_name().as_ref())
        .map_err(|e| malformed(e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = std::str::from_utf8(attr.key.local_name().as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    let id = nodes.len();
    nodes.push(XmlNode {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
        parent,
        path: String::new(),
        plain_path: String::new(),
    });
    if let Some(parent) = parent {
        nodes[parent].children.push(id);
    }
    Ok(id)
}

fn append_text(
    nodes: &mut [XmlNode],
    open: &[NodeId],
    text: &str,
    position: u64,
) -> Result<(), XmlError> {
    match open.last() {
        Some(id) => {
            nodes[*id].text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::Malformed {
            position,
            message: "text outside the root element".to_string(),
        }),
    }
}
