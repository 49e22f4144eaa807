//! Selection helpers shared by the filename-pool drivers.

use crate::hashsum::ChecksumMap;

/// Pick the lexicographically greatest name accepted by `predicate`.
///
/// Manifests are unordered maps, so sorting keeps the choice stable across
/// runs. Dated file names sort newest last.
pub fn select_latest<'a, F>(checksums: &'a ChecksumMap, predicate: F) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    let mut candidates: Vec<&str> = checksums
        .keys()
        .map(String::as_str)
        .filter(|name| predicate(name))
        .collect();
    candidates.sort_unstable();
    candidates.pop()
}

/// Strip `prefix` and `suffix` when present, leaving the rest untouched.
pub fn trim_affixes<'a>(name: &'a str, prefix: &str, suffix: &str) -> &'a str {
    let name = name.strip_prefix(prefix).unwrap_or(name);
    name.strip_suffix(suffix).unwrap_or(name)
}

/// Other names in `checksums` sharing `checksum`, in ascending order.
pub fn aliases_with_checksum<'a>(checksums: &'a ChecksumMap, checksum: &str, exclude: &str) -> Vec<&'a str> {
    let mut aliases: Vec<&str> = checksums
        .iter()
        .filter(|(name, sum)| name.as_str() != exclude && sum.eq_ignore_ascii_case(checksum))
        .map(|(name, _)| name.as_str())
        .collect();
    aliases.sort_unstable();
    aliases
}
