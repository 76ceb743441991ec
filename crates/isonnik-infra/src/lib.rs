//! Infrastructure layer for isonnik.
//!
//! Contains implementations of the ports defined in `isonnik-core`:
//! file and SQLite key/value storage, the reqwest chat backend, and
//! external-command speech. Also loads `config.toml` and resolves the
//! data directory.

pub mod config;
pub mod filesystem;
pub mod http;
pub mod kv;
pub mod speech;
