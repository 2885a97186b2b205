use std::{fmt, str::FromStr};

use chrono::{DateTime, Local};

use crate::error::Error;

pub const STORE_FILE: &str = "headver.txt";
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// A `head.bucket.build[+suffix]` version identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub head:   u32,
    pub bucket: u32,
    pub build:  u32,
    pub suffix: Option<String>,
}
impl Version {
    pub fn new(head: u32, bucket: u32, build: u32, suffix: Option<&str>) -> Self {
        Version {
            head,
            bucket,
            build,
            suffix: suffix
                .map(str::trim)
                .filter(|suffix| !suffix.is_empty())
                .map(str::to_string),
        }
    }
}
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.head, self.bucket, self.build)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "+{}", suffix)?;
        }
        Ok(())
    }
}
impl FromStr for Version {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersion(text.to_string());
        let text = text.trim();
        let (core, suffix) = match text.split_once('+') {
            Some((core, suffix)) => (core, Some(suffix)),
            None => (text, None),
        };
        // segments past the build number are ignored
        let mut parts = core.split('.');
        let (Some(head), Some(bucket), Some(build)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let head = head.parse::<u32>().map_err(|_| invalid())?;
        let bucket = bucket.parse::<u32>().map_err(|_| invalid())?;
        let build = build.parse::<u32>().map_err(|_| invalid())?;
        Ok(Version::new(head, bucket, build, suffix))
    }
}

/// The latest generated version. Only `version` survives a round-trip through the store.
#[derive(Clone, Debug)]
pub struct VersionRecord {
    pub version:     Version,
    pub description: String,
    pub timestamp:   DateTime<Local>,
}
impl VersionRecord {
    pub fn new(version: Version, description: Option<&str>) -> Self {
        let description = description
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_description(&version));
        VersionRecord {
            version,
            description,
            timestamp: Local::now(),
        }
    }
}

pub fn default_description(version: &Version) -> String {
    format!("Version {}", version)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_plain_version() {
        let version = "1.2538.3".parse::<Version>().unwrap();
        assert_eq!(version, Version::new(1, 2538, 3, None));
        assert_eq!(version.to_string(), "1.2538.3");
    }

    #[test]
    fn parses_suffixed_version() {
        let version = "0.2601.12+iOS".parse::<Version>().unwrap();
        assert_eq!(version.suffix.as_deref(), Some("iOS"));
        assert_eq!(version.build, 12);
        assert_eq!(version.to_string(), "0.2601.12+iOS");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let version = "  2.2538.1\n".parse::<Version>().unwrap();
        assert_eq!(version, Version::new(2, 2538, 1, None));
    }

    #[test]
    fn rejects_malformed_versions() {
        for text in [
            "", "1", "1.2538", "1.2538.", "a.2538.1", "1.2538.x", "-1.2538.1", "1..3",
            "+iOS", "garbage",
        ] {
            assert!(
                text.parse::<Version>().is_err(),
                "expected {:?} to be rejected",
                text
            );
        }
    }

    #[test]
    fn ignores_segments_past_build() {
        let version = "5.2538.3.1".parse::<Version>().unwrap();
        assert_eq!(version, Version::new(5, 2538, 3, None));
        let version = "5.2538.3.1+iOS".parse::<Version>().unwrap();
        assert_eq!(version, Version::new(5, 2538, 3, Some("iOS")));
    }

    #[test]
    fn accepts_build_zero_and_empty_suffix() {
        assert_eq!(
            "5.2538.0".parse::<Version>().unwrap(),
            Version::new(5, 2538, 0, None)
        );
        assert_eq!(
            "1.2538.1+".parse::<Version>().unwrap(),
            Version::new(1, 2538, 1, None)
        );
    }

    #[test]
    fn blank_suffix_is_dropped() {
        assert_eq!(Version::new(0, 2538, 1, Some("  ")).to_string(), "0.2538.1");
    }

    #[test]
    fn record_defaults_description() {
        let version = Version::new(1, 2538, 4, None);
        assert_eq!(
            VersionRecord::new(version.clone(), None).description,
            "Version 1.2538.4"
        );
        assert_eq!(
            VersionRecord::new(version.clone(), Some("   ")).description,
            "Version 1.2538.4"
        );
        assert_eq!(
            VersionRecord::new(version, Some("Trading Core")).description,
            "Trading Core"
        );
    }
}
