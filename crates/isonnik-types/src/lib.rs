//! Shared domain types for the isonnik chat client.
//!
//! This crate contains the types every layer agrees on: messages and
//! sessions, the quota snapshot, the bearer credential, the backend wire
//! format, client configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod quota;
