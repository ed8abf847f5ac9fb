//! Read-only server of the Go module download protocol.
//!
//! Given an import path and a version, modrelay derives the backing
//! repository on a code hosting service, fetches raw data through that
//! service's HTTP API, and reshapes it into the fixed output contract
//! of the `/<module>/@v/...` endpoint family.

pub mod archive;
pub mod config;
pub mod error;
pub mod hosts;
pub mod module;
pub mod protocol;
pub mod server;
