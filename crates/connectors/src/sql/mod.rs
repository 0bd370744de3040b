pub mod error;
pub mod insert;
pub mod memory;
pub mod mssql;
