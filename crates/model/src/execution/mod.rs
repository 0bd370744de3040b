pub mod connection;
pub mod work;
