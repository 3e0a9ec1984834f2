//! Dependency version constraints and a Maven-flavored version ordering.
//!
//! Versions compare by numeric segments first, then by a fixed qualifier
//! precedence rather than lexically:
//!
//! `snapshot < alpha < beta < milestone < rc < (unqualified = release =
//! final = ga) < everything else`
//!
//! Qualifiers in the last bucket (platform markers like `jre`/`android`)
//! compare lexically among themselves.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed version: numeric segments plus an optional trailing qualifier.
///
/// `1.5.1.RELEASE` → segments `[1, 5, 1]`, qualifier `RELEASE`;
/// `25.0-android` → segments `[25, 0]`, qualifier `android`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    segments: Vec<u64>,
    qualifier: Option<String>,
    raw: String,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut qualifier = None;
        for (i, part) in raw.split(['.', '-']).enumerate() {
            match part.parse::<u64>() {
                Ok(n) if qualifier.is_none() => segments.push(n),
                _ => {
                    // First non-numeric part starts the qualifier; keep the
                    // rest of the string verbatim (covers `1.0-rc-1`).
                    let consumed: usize = raw
                        .split(['.', '-'])
                        .take(i)
                        .map(|p| p.len() + 1)
                        .sum();
                    qualifier = Some(raw[consumed..].to_string());
                    break;
                }
            }
        }
        Self {
            segments,
            qualifier,
            raw: raw.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u64 {
        self.segments.first().copied().unwrap_or(0)
    }

    pub fn minor(&self) -> u64 {
        self.segments.get(1).copied().unwrap_or(0)
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Pre-release or snapshot versions are excluded by `latest.release`.
    pub fn is_prerelease(&self) -> bool {
        qualifier_rank(self.qualifier.as_deref()).0 < STABLE_RANK
    }

    fn segment(&self, i: usize) -> u64 {
        self.segments.get(i).copied().unwrap_or(0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

const STABLE_RANK: u8 = 5;

/// Fixed precedence bucket for a qualifier, plus the lexical tiebreak key
/// used inside the top bucket.
fn qualifier_rank(qualifier: Option<&str>) -> (u8, String) {
    let Some(q) = qualifier else {
        return (STABLE_RANK, String::new());
    };
    let lower = q.to_ascii_lowercase();
    let head: String = lower.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let rank = match head.as_str() {
        "snapshot" => 0,
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "milestone" | "m" => 3,
        "rc" | "cr" => 4,
        "release" | "final" | "ga" => STABLE_RANK,
        _ => 6,
    };
    (rank, lower)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        let (self_rank, self_key) = qualifier_rank(self.qualifier());
        let (other_rank, other_key) = qualifier_rank(other.qualifier());
        self_rank
            .cmp(&other_rank)
            .then_with(|| match (self_rank, other_rank) {
                // Only the catch-all bucket falls back to lexical order;
                // `release`/`final`/`ga` tie with unqualified.
                (6, 6) => self_key.cmp(&other_key),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shape of a version constraint expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeKind {
    /// A literal version; matches only itself.
    Exact(String),
    /// `25-28`: numeric major component within `[low, high]`.
    MajorRange { low: u64, high: u64 },
    /// `~1.5`: lock major.minor, float the rest.
    TildeMinor { major: u64, minor: u64 },
    /// `latest.release`: highest non-prerelease candidate.
    LatestRelease,
    /// `latest.integration`: highest candidate of any kind.
    LatestIntegration,
}

/// A parsed constraint plus an optional required suffix (e.g. `-jre`).
///
/// When a suffix is required, only candidates carrying it are eligible, so
/// the selected version comes out with the suffix already normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    kind: RangeKind,
    suffix: Option<String>,
}

impl VersionRange {
    /// Parse a constraint expression. Anything that is not a recognized
    /// range form is treated as an exact version, so a misspelled keyword
    /// surfaces later as "no matching candidate" rather than an error here.
    pub fn parse(expr: &str, suffix: Option<&str>) -> Self {
        let trimmed = expr.trim();
        let suffix = suffix.map(|s| s.trim_start_matches('-').to_string());
        let kind = match trimmed {
            "latest.release" => RangeKind::LatestRelease,
            "latest.integration" => RangeKind::LatestIntegration,
            _ => {
                if let Some(rest) = trimmed.strip_prefix('~') {
                    let v = Version::parse(rest);
                    RangeKind::TildeMinor {
                        major: v.major(),
                        minor: v.minor(),
                    }
                } else if let Some((low, high)) = parse_major_range(trimmed) {
                    RangeKind::MajorRange { low, high }
                } else {
                    RangeKind::Exact(trimmed.to_string())
                }
            }
        };
        Self { kind, suffix }
    }

    pub fn kind(&self) -> &RangeKind {
        &self.kind
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    fn admits(&self, candidate: &Version) -> bool {
        if let Some(suffix) = &self.suffix {
            if candidate.qualifier() != Some(suffix.as_str()) {
                return false;
            }
        }
        match &self.kind {
            RangeKind::Exact(raw) => candidate.raw() == raw,
            RangeKind::MajorRange { low, high } => {
                (*low..=*high).contains(&candidate.major())
            }
            RangeKind::TildeMinor { major, minor } => {
                candidate.major() == *major && candidate.minor() == *minor
            }
            RangeKind::LatestRelease => !candidate.is_prerelease(),
            RangeKind::LatestIntegration => true,
        }
    }

    /// Pick the highest eligible candidate, or `None` when nothing matches.
    /// "No match" is a legitimate no-op outcome, not an error.
    pub fn select<'v>(&self, candidates: &'v [Version]) -> Option<&'v Version> {
        candidates
            .iter()
            .filter(|c| self.admits(c))
            .max_by(|a, b| a.cmp(b))
    }
}

fn parse_major_range(expr: &str) -> Option<(u64, u64)> {
    let (low, high) = expr.split_once('-')?;
    let low = low.trim().parse::<u64>().ok()?;
    let high = high.trim().parse::<u64>().ok()?;
    (low <= high).then_some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn versions(raws: &[&str]) -> Vec<Version> {
        raws.iter().map(|r| Version::parse(r)).collect()
    }

    #[test]
    fn parses_segments_and_qualifier() {
        let v = Version::parse("1.5.1.RELEASE");
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 5);
        assert_eq!(v.qualifier(), Some("RELEASE"));

        let v = Version::parse("25.0-android");
        assert_eq!(v.major(), 25);
        assert_eq!(v.qualifier(), Some("android"));
    }

    #[test]
    fn numeric_segments_compare_numerically_not_lexically() {
        assert!(Version::parse("1.5.22.RELEASE") > Version::parse("1.5.9.RELEASE"));
        assert!(Version::parse("10.0") > Version::parse("9.9"));
    }

    #[test]
    fn qualifier_precedence_is_fixed_not_lexical() {
        assert!(Version::parse("1.0-SNAPSHOT") < Version::parse("1.0-rc1"));
        assert!(Version::parse("1.0-rc1") < Version::parse("1.0"));
        assert_eq!(
            Version::parse("1.0.RELEASE").cmp(&Version::parse("1.0")),
            std::cmp::Ordering::Equal
        );
        assert!(Version::parse("25.0-android") < Version::parse("25.0-jre"));
    }

    #[test]
    fn tilde_locks_major_minor() {
        let range = VersionRange::parse("~1.5", None);
        let candidates = versions(&[
            "1.4.9.RELEASE",
            "1.5.1.RELEASE",
            "1.5.22.RELEASE",
            "2.0.0.RELEASE",
        ]);
        assert_eq!(range.select(&candidates).unwrap().raw(), "1.5.22.RELEASE");
    }

    #[test]
    fn major_range_with_required_suffix() {
        let range = VersionRange::parse("25-28", Some("-jre"));
        let candidates = versions(&[
            "24.1-jre",
            "25.0-android",
            "27.1-jre",
            "28.0-android",
            "28.0-jre",
            "29.0-jre",
        ]);
        assert_eq!(range.select(&candidates).unwrap().raw(), "28.0-jre");
    }

    #[test]
    fn latest_release_skips_prereleases() {
        let range = VersionRange::parse("latest.release", None);
        let candidates = versions(&["1.0", "2.0-SNAPSHOT", "1.9.RELEASE", "2.0-rc1"]);
        assert_eq!(range.select(&candidates).unwrap().raw(), "1.9.RELEASE");
    }

    #[test]
    fn latest_integration_takes_anything() {
        let range = VersionRange::parse("latest.integration", None);
        let candidates = versions(&["1.0", "2.0-SNAPSHOT"]);
        assert_eq!(range.select(&candidates).unwrap().raw(), "2.0-SNAPSHOT");
    }

    #[test]
    fn no_eligible_candidate_is_none_not_an_error() {
        let range = VersionRange::parse("25-28", Some("-jre"));
        let candidates = versions(&["25.0-android", "29.0-jre"]);
        assert_eq!(range.select(&candidates), None);
    }

    #[test]
    fn unrecognized_expression_falls_back_to_exact() {
        let range = VersionRange::parse("1.5.22.RELEASE", None);
        assert_eq!(
            range.kind(),
            &RangeKind::Exact("1.5.22.RELEASE".to_string())
        );
        let candidates = versions(&["1.5.22.RELEASE", "1.5.23.RELEASE"]);
        assert_eq!(range.select(&candidates).unwrap().raw(), "1.5.22.RELEASE");
    }

    #[test]
    fn range_round_trips_through_json() {
        let range = VersionRange::parse("25-28", Some("-jre"));
        let json = serde_json::to_string(&range).unwrap();
        let back: VersionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }
}
