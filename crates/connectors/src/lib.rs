pub mod source;
pub mod sql;
pub mod xml;
