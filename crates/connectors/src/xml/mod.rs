pub mod error;
pub mod parser;
pub mod tree;

pub use error::XmlError;
pub use parser::XmlParser;
pub use tree::{FlatElement, NodeId, XmlNode, XmlTree};
