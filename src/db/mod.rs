pub mod connection;
pub mod migration_runner;

pub use connection::Database;
