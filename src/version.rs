// src/version.rs

//! Version names for index packages
//!
//! A version name is a dotted list of up to four numeric segments with an
//! optional pre-release suffix (`1.0`, `1.2.3`, `1.0-beta2`, `2.0rc`).
//!
//! Canonical form: trailing zero segments beyond the second are dropped and a
//! single segment is padded to two, so `1`, `1.0` and `1.0.0` are all the same
//! version and display as `1.0`.
//!
//! Every version also has a version code, an `i64` that sorts exactly like the
//! version itself. The registry stores installed versions as codes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Maximum number of numeric segments
pub const MAX_SEGMENTS: usize = 4;

/// Largest value a single segment may hold
///
/// Four 13-bit segments and the 11 pre-release bits fill the 63 value bits of
/// a non-negative `i64` version code.
pub const MAX_SEGMENT: u32 = (1 << SEGMENT_BITS) - 1;

const SEGMENT_BITS: u32 = 13;
const NUMBER_BITS: u32 = 8;
const LABEL_BITS: u32 = 2;
const MARKER_BITS: u32 = 1 + LABEL_BITS + NUMBER_BITS;

/// Pre-release stage, ordered from least to most mature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Alpha,
    Beta,
    Pre,
    Rc,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Alpha => "alpha",
            Stage::Beta => "beta",
            Stage::Pre => "pre",
            Stage::Rc => "rc",
        }
    }

    fn bits(self) -> i64 {
        match self {
            Stage::Alpha => 0,
            Stage::Beta => 1,
            Stage::Pre => 2,
            Stage::Rc => 3,
        }
    }

    fn from_bits(bits: i64) -> Self {
        match bits & 0b11 {
            0 => Stage::Alpha,
            1 => Stage::Beta,
            2 => Stage::Pre,
            _ => Stage::Rc,
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpha" => Ok(Stage::Alpha),
            "beta" => Ok(Stage::Beta),
            "pre" => Ok(Stage::Pre),
            "rc" => Ok(Stage::Rc),
            _ => Err(format!("Invalid pre-release label: {}", s)),
        }
    }
}

/// Pre-release marker (`beta2` in `1.0-beta2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub stage: Stage,
    pub number: u8,
}

/// A comparable version name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionName {
    segments: [u16; MAX_SEGMENTS],
    pre_release: Option<PreRelease>,
}

impl VersionName {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Parse("empty version name".to_string()));
        }

        let split = input
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(input.len());
        let (numbers, suffix) = input.split_at(split);

        let mut segments = [0u16; MAX_SEGMENTS];
        let mut count = 0;

        for part in numbers.split('.') {
            if part.is_empty() {
                return Err(Error::Parse(format!("invalid version name '{}'", input)));
            }
            if count == MAX_SEGMENTS {
                return Err(Error::Parse(format!(
                    "version name '{}' has more than {} segments",
                    input, MAX_SEGMENTS
                )));
            }

            let value: u32 = part
                .parse()
                .ok()
                .filter(|v| *v <= MAX_SEGMENT)
                .ok_or_else(|| {
                    Error::Parse(format!(
                        "version segment '{}' in '{}' exceeds {}, the largest segment a version code can store",
                        part, input, MAX_SEGMENT
                    ))
                })?;

            segments[count] = value as u16;
            count += 1;
        }

        let pre_release = if suffix.is_empty() {
            None
        } else {
            Some(Self::parse_pre_release(input, suffix)?)
        };

        Ok(Self {
            segments,
            pre_release,
        })
    }

    fn parse_pre_release(input: &str, suffix: &str) -> Result<PreRelease> {
        let suffix = suffix.strip_prefix('-').unwrap_or(suffix);
        let digits = suffix
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(suffix.len());
        let (label, number) = suffix.split_at(digits);

        let stage = label
            .parse::<Stage>()
            .map_err(|e| Error::Parse(format!("{} in version name '{}'", e, input)))?;

        let number = if number.is_empty() {
            0
        } else {
            number.parse::<u8>().map_err(|_| {
                Error::Parse(format!("invalid pre-release number in '{}'", input))
            })?
        };

        Ok(PreRelease { stage, number })
    }

    /// Numeric segments in canonical form
    pub fn segments(&self) -> &[u16] {
        let last = self
            .segments
            .iter()
            .rposition(|s| *s != 0)
            .map(|i| i + 1)
            .unwrap_or(0);

        &self.segments[..last.max(2)]
    }

    pub fn pre_release(&self) -> Option<PreRelease> {
        self.pre_release
    }

    /// Whether this is a stable release (no pre-release marker)
    pub fn is_stable(&self) -> bool {
        self.pre_release.is_none()
    }

    /// Totally ordered integer encoding used for storage
    pub fn code(&self) -> i64 {
        let mut code: i64 = 0;

        for segment in self.segments {
            code = (code << SEGMENT_BITS) | segment as i64;
        }

        let marker = match self.pre_release {
            None => 1 << (LABEL_BITS + NUMBER_BITS),
            Some(pre) => (pre.stage.bits() << NUMBER_BITS) | pre.number as i64,
        };

        (code << MARKER_BITS) | marker
    }

    /// Decode a version code produced by [`VersionName::code`]
    pub fn from_code(code: i64) -> Result<Self> {
        if code < 0 {
            return Err(Error::Parse(format!("invalid version code {}", code)));
        }

        let marker = code & ((1 << MARKER_BITS) - 1);
        let stable = marker >> (LABEL_BITS + NUMBER_BITS) == 1;
        let stage_bits = (marker >> NUMBER_BITS) & ((1 << LABEL_BITS) - 1);
        let number = marker & ((1 << NUMBER_BITS) - 1);

        let pre_release = if stable {
            if stage_bits != 0 || number != 0 {
                return Err(Error::Parse(format!("invalid version code {}", code)));
            }
            None
        } else {
            Some(PreRelease {
                stage: Stage::from_bits(stage_bits),
                number: number as u8,
            })
        };

        let mut rest = code >> MARKER_BITS;
        let mut segments = [0u16; MAX_SEGMENTS];
        for segment in segments.iter_mut().rev() {
            *segment = (rest & MAX_SEGMENT as i64) as u16;
            rest >>= SEGMENT_BITS;
        }

        Ok(Self {
            segments,
            pre_release,
        })
    }
}

impl Ord for VersionName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| match (self.pre_release, other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for VersionName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<String> = self.segments().iter().map(|s| s.to_string()).collect();
        write!(f, "{}", segments.join("."))?;

        if let Some(pre) = self.pre_release {
            write!(f, "-{}", pre.stage.as_str())?;
            if pre.number != 0 {
                write!(f, "{}", pre.number)?;
            }
        }

        Ok(())
    }
}

impl FromStr for VersionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<VersionName> for String {
    fn from(version: VersionName) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionName {
        VersionName::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display_canonical() {
        for input in ["1.0", "1.2", "1.2.3", "1.0.0.1", "0.0", "2.0-beta", "1.3-rc2"] {
            assert_eq!(v(input).to_string(), input);
        }
    }

    #[test]
    fn test_canonicalization() {
        assert_eq!(v("1").to_string(), "1.0");
        assert_eq!(v("1.2.0.0").to_string(), "1.2");
        assert_eq!(v("1.0beta0").to_string(), "1.0-beta");
        assert_eq!(v("1.0RC1").to_string(), "1.0-rc1");
        assert_eq!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "a", "1..2", "1.", ".1", "1.2.3.4.5", "8192", "1.0-gamma", "1.0-beta999", "1.0beta1x"] {
            let result = VersionName::parse(input);
            assert!(
                matches!(result, Err(Error::Parse(_))),
                "'{}' should not parse",
                input
            );
        }
    }

    #[test]
    fn test_segment_limit() {
        assert_eq!(v("8191.8191.8191.8191").segments(), &[8191, 8191, 8191, 8191]);

        match VersionName::parse("1.0.9000") {
            Err(Error::Parse(msg)) => {
                assert!(msg.contains("'9000'"), "{}", msg);
                assert!(msg.contains("8191"), "{}", msg);
                assert!(msg.contains("version code"), "{}", msg);
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.2") < v("1.10"));
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.0-beta") < v("1.0"));
        assert!(v("1.0-alpha3") < v("1.0-beta"));
        assert!(v("1.0-rc1") < v("1.0-rc2"));
        assert!(v("1.0-rc9") > v("0.9"));
    }

    #[test]
    fn test_equality_includes_pre_release() {
        assert_ne!(v("1.0-beta"), v("1.0"));
        assert_ne!(v("1.0-beta"), v("1.0-rc"));
        assert_eq!(v("1.0-beta"), v("1.0beta"));
    }

    #[test]
    fn test_code_preserves_order() {
        let sorted = [
            "0.0", "0.1", "0.9-alpha", "0.9-rc3", "0.9", "1.0-beta", "1.0", "1.0.0.1", "1.0.1",
            "1.2", "8191.0",
        ];

        for pair in sorted.windows(2) {
            let (a, b) = (v(pair[0]), v(pair[1]));
            assert!(a < b, "{} < {}", a, b);
            assert!(a.code() < b.code(), "code({}) < code({})", a, b);
        }
    }

    #[test]
    fn test_code_round_trip() {
        for input in ["0.0", "1.0", "4.2.1", "1.0-beta2", "8191.8191.8191.8191"] {
            let version = v(input);
            assert!(version.code() >= 0);
            assert_eq!(VersionName::from_code(version.code()).unwrap(), version);
        }
    }

    #[test]
    fn test_invalid_code() {
        assert!(VersionName::from_code(-1).is_err());
        // stable bit set together with a pre-release number
        assert!(VersionName::from_code((1 << 10) | 1).is_err());
    }

    #[test]
    fn test_default_is_zero() {
        let zero = VersionName::default();
        assert_eq!(zero, v("0.0"));
        assert!(zero < v("0.0.1"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.2-rc1")).unwrap();
        assert_eq!(json, "\"1.2-rc1\"");
        let back: VersionName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2-rc1"));
    }
}
