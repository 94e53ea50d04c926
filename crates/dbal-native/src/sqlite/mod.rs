//! SQLite backend built on SQLx

mod config;
mod connection;
pub mod decode;
mod statement;

pub use config::SqliteConfig;
pub use connection::SqliteConnection;
pub use statement::SqliteStatement;
