//! Comparable version keys.
//!
//! Two orderings are provided:
//! - [`DottedVersion`]: `vMAJOR.MINOR...` releases with an optional pre-release
//!   suffix and an ignored `+build` segment. Trailing zero components are
//!   insignificant and a suffixed version sorts below its plain release.
//! - [`TildeVersion`]: Debian-style ordering over alternating text/digit runs,
//!   where a `~` marks an earlier variant (`1.0~rc1 < 1.0`).

use crate::error::{AddonHubError, Result};
use std::cmp::Ordering;
use std::str::FromStr;

/// A run of ASCII digits compared by numeric value, of any length.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits(String);

impl Digits {
    fn new(raw: &str) -> Self {
        let trimmed = raw.trim_start_matches('0');
        if trimmed.is_empty() {
            Digits("0".to_string())
        } else {
            Digits(trimmed.to_string())
        }
    }

    fn is_zero(&self) -> bool {
        self.0 == "0"
    }
}

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One element of a natural-order tuple. Text and number runs alternate,
/// always starting with (possibly empty) text, so a `Text` is never compared
/// against a `Number` at the same position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NatPart<T> {
    Text(T),
    Number(Digits),
}

/// Split `value` into alternating text/digit runs, converting text runs.
fn nat_parts<T>(value: &str, convert: impl Fn(&str) -> T) -> Vec<NatPart<T>> {
    let mut parts = Vec::new();
    let mut rest = value;
    loop {
        let text_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        parts.push(NatPart::Text(convert(&rest[..text_end])));
        rest = &rest[text_end..];
        if rest.is_empty() {
            break;
        }
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        parts.push(NatPart::Number(Digits::new(&rest[..digits_end])));
        rest = &rest[digits_end..];
    }
    parts
}

/// Pre-release suffix of a dotted version. `Release` sorts above any suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Suffix {
    PreRelease(Vec<NatPart<String>>),
    Release,
}

/// A `vMAJOR.MINOR...[suffix][+build]` version.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    original: String,
    release: Vec<Digits>,
    suffix: Suffix,
}

impl DottedVersion {
    /// Parse a version string, case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || AddonHubError::InvalidVersionFormat {
            version: value.to_string(),
        };

        let lowered = value.to_lowercase();
        let rest = lowered.strip_prefix('v').unwrap_or(&lowered);

        let mut release = Vec::new();
        let mut cursor = rest;
        loop {
            let end = cursor
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(cursor.len());
            if end == 0 {
                break;
            }
            release.push(Digits::new(&cursor[..end]));
            cursor = &cursor[end..];
            match cursor.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => cursor = next,
                _ => break,
            }
        }
        if release.is_empty() {
            return Err(invalid());
        }

        // Build metadata never takes part in comparisons.
        let extra = cursor.split_once('+').map_or(cursor, |(extra, _)| extra);

        while release.last().is_some_and(Digits::is_zero) {
            release.pop();
        }

        let suffix = if extra.is_empty() {
            Suffix::Release
        } else {
            Suffix::PreRelease(nat_parts(&format!("{}0", extra), str::to_string))
        };

        Ok(Self {
            original: value.to_string(),
            release,
            suffix,
        })
    }

    /// Parse, returning `None` when the string isn't a dotted version.
    pub fn try_parse(value: &str) -> Option<Self> {
        Self::parse(value).ok()
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(self.suffix, Suffix::PreRelease(_))
    }
}

impl FromStr for DottedVersion {
    type Err = AddonHubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.original)
    }
}

/// Text segment of a tilde-aware run. `Infinity` terminates every run so that
/// fewer `~` segments sort higher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TildeSegment {
    Text(String),
    Infinity,
}

fn tilde_segments(text: &str) -> Vec<TildeSegment> {
    text.split('~')
        .map(|s| TildeSegment::Text(s.to_string()))
        .chain(std::iter::once(TildeSegment::Infinity))
        .collect()
}

/// Debian-style version/tag key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TildeVersion {
    key: Vec<NatPart<Vec<TildeSegment>>>,
}

impl TildeVersion {
    pub fn new(value: &str) -> Self {
        Self {
            key: nat_parts(value, tilde_segments),
        }
    }
}

impl From<&str> for TildeVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Compare two strings under the tilde-aware ordering.
pub fn compare_tilde(a: &str, b: &str) -> Ordering {
    TildeVersion::new(a).cmp(&TildeVersion::new(b))
}

/// Whether `candidate` names the same version as `wanted`.
///
/// Exact string equality wins; otherwise both sides are compared as dotted
/// releases (falling back to string equality when either fails to parse),
/// then under the tilde ordering. The last step only adds numeric-run
/// equivalence for strings that aren't dotted releases, e.g. `release-01`
/// and `release-1`.
pub fn versions_match(candidate: &str, wanted: &str) -> bool {
    if candidate == wanted {
        return true;
    }
    if let (Some(a), Some(b)) = (
        DottedVersion::try_parse(candidate),
        DottedVersion::try_parse(wanted),
    ) {
        if a == b {
            return true;
        }
    }
    compare_tilde(candidate, wanted) == Ordering::Equal
}
