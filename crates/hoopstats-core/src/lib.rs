// Library root: configuration and SQLite storage shared by the loader crates.

pub mod config;
pub mod db;
