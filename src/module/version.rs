//! Version string grammar
//!
//! A client-facing version is one of three disjoint shapes: a
//! canonical semantic tag (`v1.2.3`, optional pre-release), a
//! pseudo-version encoding a commit time and short hash
//! (`v0.0.0-20180311214515-816c9085562c`), or either of those with a
//! trailing `+incompatible` annotation.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ProtocolError;

/// Timestamp layout inside a pseudo-version: YYYYMMDDHHMMSS
const PSEUDO_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of the short commit identifier built by this engine
const SHORT_SHA_LEN: usize = 12;

/// Builds a pseudo-version from a commit time and short hash.
pub fn pseudo(t: DateTime<Utc>, short_sha: &str) -> String {
    format!("v0.0.0-{}-{}", t.format(PSEUDO_TIME_FORMAT), short_sha)
}

/// True iff `v` has the pseudo-version shape: at least three hyphen
/// separated components, the first equal to `v0.0.0`, the second a
/// valid 14-digit UTC timestamp.
pub fn is_pseudo(v: &str) -> bool {
    let mut parts = v.split('-');
    let (Some(base), Some(stamp), Some(_)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    base == "v0.0.0" && parse_pseudo_time(stamp).is_some()
}

/// Extracts the commit identifier from a pseudo-version.
pub fn sha_from_pseudo(v: &str) -> Result<&str, ProtocolError> {
    v.split('-')
        .nth(2)
        .ok_or_else(|| ProtocolError::BadVersion(format!("incorrect pseudo version: {v}")))
}

/// Reduces a client version to the upstream ref it denotes.
///
/// Strips a trailing `+incompatible`, then resolves pseudo-versions to
/// their embedded commit identifier. The returned flag is true when
/// the input was a pseudo-version, for callers that must re-assemble
/// one from the discovered commit time.
pub fn normalize(v: &str) -> Result<(String, bool), ProtocolError> {
    let stripped = strip_incompatible(v);
    if is_pseudo(stripped) {
        let sha = sha_from_pseudo(stripped)?;
        return Ok((sha.to_string(), true));
    }
    Ok((stripped.to_string(), false))
}

/// Removes the `+incompatible` annotation, if present.
pub fn strip_incompatible(v: &str) -> &str {
    v.strip_suffix("+incompatible").unwrap_or(v)
}

/// True iff the tag equals its canonical semantic form: leading `v`,
/// full `MAJOR.MINOR.PATCH`, optional pre-release, no build metadata.
pub fn is_canonical(tag: &str) -> bool {
    let Some(rest) = tag.strip_prefix('v') else {
        return false;
    };
    match semver::Version::parse(rest) {
        Ok(parsed) => parsed.build.is_empty() && format!("v{parsed}") == tag,
        Err(_) => false,
    }
}

/// The `v<MAJOR>` component of a semantic version, for alias filters.
pub fn major(v: &str) -> Option<&str> {
    let prefix = v.split('.').next()?;
    let digits = prefix.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(prefix)
}

/// Shortened form of a full commit identifier.
pub fn short_sha(name: &str) -> &str {
    &name[..name.len().min(SHORT_SHA_LEN)]
}

fn parse_pseudo_time(stamp: &str) -> Option<NaiveDateTime> {
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, PSEUDO_TIME_FORMAT).ok()
}
