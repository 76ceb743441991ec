//! Business logic and port trait definitions for the isonnik chat client.
//!
//! This crate defines the "ports" that the infrastructure layer implements
//! (`KvStore`, `ChatBackend`, `SpeechEngine`) and the sink the renderer
//! implements (`SessionSink`). It depends only on `isonnik-types` -- never
//! on `isonnik-infra` or any network/storage crate.

pub mod account;
pub mod backend;
pub mod chat;
pub mod quota;
pub mod render;
pub mod speech;
pub mod storage;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;
