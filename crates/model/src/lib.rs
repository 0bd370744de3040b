pub mod contract;
pub mod core;
pub mod execution;
pub mod records;

pub use contract::MappingContract;
pub use core::value::Value;
