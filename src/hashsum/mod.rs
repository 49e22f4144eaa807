//! Parsers for the checksum manifests distributions publish next to their
//! images.
//!
//! Two dialects are understood:
//!
//! - BSD, as written by `sha256sum --tag`: `SHA256 (name) = hex`
//! - GNU, as written by plain `sha256sum`: `hex  name`, where the name may
//!   carry a leading `*` binary-mode marker
//!
//! Lines outside the active dialect (PGP armour, comments, other algorithms)
//! are skipped without error.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::OnceLock;

use regex::Regex;

use crate::cloud::ChecksumKind;

/// File name to lowercase hex digest.
pub type ChecksumMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumFormat {
    Bsd,
    Gnu,
}

fn bsd_line_regex() -> &'static Regex {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINE_RE.get_or_init(|| {
        Regex::new(r"^(?P<tag>SHA256|SHA512) *\( *(?P<name>[^)]+?) *\) *= *(?P<checksum>[A-Fa-f0-9]+)$")
            .expect("invalid BSD checksum line regex")
    })
}

fn gnu_line_regex() -> &'static Regex {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINE_RE.get_or_init(|| {
        Regex::new(r"^(?P<checksum>[A-Fa-f0-9]+) +(?P<name>\S+)$")
            .expect("invalid GNU checksum line regex")
    })
}

/// Parse a checksum manifest into a name→digest map.
///
/// Only digests of `kind` are kept: a BSD line must carry the matching
/// algorithm tag and every digest must have the expected length. When a name
/// appears twice the last line wins.
///
/// # Errors
///
/// Only a failing read of `stream` is an error. Lines that are not valid
/// UTF-8 are skipped, and a manifest without a single matching line yields an
/// empty map.
pub fn parse<R: BufRead>(stream: R, format: ChecksumFormat, kind: ChecksumKind) -> io::Result<ChecksumMap> {
    let line_re = match format {
        ChecksumFormat::Bsd => bsd_line_regex(),
        ChecksumFormat::Gnu => gnu_line_regex(),
    };

    let mut checksums = ChecksumMap::new();
    for line in stream.split(b'\n') {
        let line = line?;
        // Signature blocks may carry arbitrary bytes.
        let Ok(line) = std::str::from_utf8(&line) else {
            continue;
        };
        let Some(caps) = line_re.captures(line.trim()) else {
            continue;
        };

        if format == ChecksumFormat::Bsd && &caps["tag"] != kind.bsd_tag() {
            continue;
        }

        let checksum = &caps["checksum"];
        if checksum.len() != kind.hex_len() {
            continue;
        }

        let name = &caps["name"];
        let name = match format {
            ChecksumFormat::Gnu => name.strip_prefix('*').unwrap_or(name),
            ChecksumFormat::Bsd => name,
        };

        checksums.insert(name.to_string(), checksum.to_ascii_lowercase());
    }

    Ok(checksums)
}
