pub mod connection;
pub mod params;
pub mod statement;

pub use connection::{MssqlBulkInsert, MssqlClient, MssqlProvider, connect};
