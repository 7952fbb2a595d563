//! Target store implementations.

mod mysql;

pub use mysql::MysqlTarget;
