//! Import-path parsing

use percent_encoding::percent_decode_str;

use crate::error::ProtocolError;

/// Host prefix served by the GitHub-style adapter
pub const GITHUB_HOST: &str = "github.com";

/// Host prefix served by the Bitbucket-style adapter
pub const BITBUCKET_HOST: &str = "bitbucket.org";

/// Host prefix of major-in-path aliases (`gopkg.in/yaml.v2`)
pub const GOPKG_HOST: &str = "gopkg.in";

/// Splits a direct-host import path into `(owner, repo)`.
///
/// Valid only for paths of exactly three segments whose first segment
/// is a known direct host. Major-in-path aliases are rejected here;
/// callers must use [`parse_major_in_path`] for those.
pub fn split_path(path: &str) -> Result<(String, String), ProtocolError> {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.first().copied() {
        Some(GITHUB_HOST) | Some(BITBUCKET_HOST) => {
            if segments.len() != 3 {
                return Err(ProtocolError::BadPath(format!(
                    "expected <host>/<owner>/<repo>, got {path}"
                )));
            }
            Ok((segments[1].to_string(), segments[2].to_string()))
        }
        Some(GOPKG_HOST) => Err(ProtocolError::BadPath(format!(
            "{path} embeds its major version in the path"
        ))),
        _ => Err(ProtocolError::BadPath(format!("unsupported host in {path}"))),
    }
}

/// Parses a major-in-path alias into `(owner, repo, major)`.
///
/// Two forms are accepted: `gopkg.in/<repo>.vN`, whose owner follows
/// the published `go-<repo>` convention, and
/// `gopkg.in/<owner>/<repo>.vN`.
pub fn parse_major_in_path(path: &str) -> Result<(String, String, String), ProtocolError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != 2 && segments.len() != 3 {
        return Err(ProtocolError::BadPath(format!(
            "expected 1 or 2 segments after the host, got {path}"
        )));
    }

    let last = segments[segments.len() - 1];
    let (repo, major) = last.split_once(".v").ok_or_else(|| {
        ProtocolError::BadPath(format!("no major version suffix in {path}"))
    })?;
    let major = format!("v{major}");

    let owner = if segments.len() == 2 {
        format!("go-{repo}")
    } else {
        segments[1].to_string()
    };

    Ok((owner, repo.to_string(), major))
}

/// Decodes an escaped module path from a request URL.
///
/// Percent escapes are decoded first, then the case escaping of the
/// module-path contract is reversed: `!a` becomes `A`.
pub fn decode_path(escaped: &str) -> Result<String, ProtocolError> {
    unescape(escaped).map_err(|msg| ProtocolError::BadPath(format!("{msg}: {escaped}")))
}

/// Decodes an escaped version segment from a request URL.
pub fn decode_version(escaped: &str) -> Result<String, ProtocolError> {
    unescape(escaped).map_err(|msg| ProtocolError::BadVersion(format!("{msg}: {escaped}")))
}

fn unescape(escaped: &str) -> Result<String, &'static str> {
    let decoded = percent_decode_str(escaped)
        .decode_utf8()
        .map_err(|_| "invalid percent escaping")?;

    let mut out = String::with_capacity(decoded.len());
    let mut chars = decoded.chars();
    while let Some(c) = chars.next() {
        if c != '!' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(l) if l.is_ascii_lowercase() => out.push(l.to_ascii_uppercase()),
            _ => return Err("dangling case escape"),
        }
    }

    Ok(out)
}
