//! Import-path and version grammar
//!
//! Pure functions shared by every protocol layer: splitting import
//! paths into host coordinates, classifying version strings, and
//! reversing the escaping applied to URL path segments.
//!
//! - [`path`]: import-path parsing and segment unescaping
//! - [`version`]: semantic tags, pseudo-versions, `+incompatible`

pub mod path;
pub mod version;
