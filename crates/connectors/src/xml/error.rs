use thiserror::Error;

/// Errors raised while turning raw XML into an [`XmlTree`](super::XmlTree).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum XmlError {
    #[error("XML content is empty")]
    Empty,

    #[error("Malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("XML document has more than one root element")]
    MultipleRoots,

    #[error("Element <{0}> is never closed")]
    Unclosed(String),

    #[error("XML document has no root element")]
    NoRoot,
}
