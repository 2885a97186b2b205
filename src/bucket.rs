use std::{
    path::{Path, PathBuf},
    process::Command,
};

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    types::Version,
};

/// What to ask a [`BucketSource`] to stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StampRequest<'a> {
    pub head:   u32,
    pub build:  u32,
    pub suffix: Option<&'a str>,
}
impl StampRequest<'static> {
    /// The request used to discover the current bucket.
    pub const PROBE: Self = StampRequest {
        head:   0,
        build:  1,
        suffix: None,
    };
}

/// Provides the year-week bucket and formats version strings for it.
pub trait BucketSource {
    fn stamp(&self, request: &StampRequest) -> Result<Version>;

    fn bucket(&self) -> Result<u32> {
        self.stamp(&StampRequest::PROBE).map(|v| v.bucket)
    }
}
impl<T: BucketSource + ?Sized> BucketSource for Box<T> {
    fn stamp(&self, request: &StampRequest) -> Result<Version> {
        (**self).stamp(request)
    }

    fn bucket(&self) -> Result<u32> {
        (**self).bucket()
    }
}

/// Two-digit ISO week-year followed by the two-digit ISO week, `2538` for 2025-09-15.
pub fn calendar_bucket(date: NaiveDate) -> u32 {
    let week = date.iso_week();
    (week.year().rem_euclid(100) as u32) * 100 + week.week()
}

/// Buckets by the local date, or by a fixed one.
#[derive(Clone, Debug, Default)]
pub struct CalendarBucketSource {
    date: Option<NaiveDate>,
}
impl CalendarBucketSource {
    pub fn today() -> Self {
        CalendarBucketSource { date: None }
    }

    #[cfg(test)]
    pub fn fixed(date: NaiveDate) -> Self {
        CalendarBucketSource { date: Some(date) }
    }

    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}
impl BucketSource for CalendarBucketSource {
    fn stamp(&self, request: &StampRequest) -> Result<Version> {
        Ok(Version::new(
            request.head,
            calendar_bucket(self.date()),
            request.build,
            request.suffix,
        ))
    }
}

/// Runs an external helper invoked as `helper head=<N> build=<N> [suffix=<S>]`
/// that prints a `version: <version>` line.
#[derive(Clone, Debug)]
pub struct HelperBucketSource {
    program: PathBuf,
}
impl HelperBucketSource {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        HelperBucketSource {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}
impl BucketSource for HelperBucketSource {
    fn stamp(&self, request: &StampRequest) -> Result<Version> {
        let mut command = Command::new(&self.program);
        command
            .arg(format!("head={}", request.head))
            .arg(format!("build={}", request.build));
        if let Some(suffix) = request.suffix.filter(|suffix| !suffix.is_empty()) {
            command.arg(format!("suffix={}", suffix));
        }
        debug!(program = %self.program.display(), ?request, "running version helper");
        let output = command.output().map_err(|source| Error::HelperSpawn {
            program: self.program.clone(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = parse_helper_output(&stdout).ok_or_else(|| Error::HelperNoVersion {
            program: self.program.clone(),
            status:  output.status,
        })?;
        let version = version.parse::<Version>()?;
        if version.head != request.head || version.build != request.build {
            warn!(
                requested_head = request.head,
                requested_build = request.build,
                %version,
                "version helper stamped a different version than requested"
            );
        }
        Ok(version)
    }
}

/// Returns the text after the first `version:` line in helper output.
pub fn parse_helper_output(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("version:"))
        .map(str::trim)
        .filter(|version| !version.is_empty())
}

/// Bucket for showing to the user; falls back to today's calendar bucket
/// when the source fails. Never use this to generate a version.
pub fn bucket_for_display(source: &dyn BucketSource) -> u32 {
    source.bucket().unwrap_or_else(|e| {
        warn!("couldn't get bucket from source, using calendar: {}", e);
        calendar_bucket(Local::now().date_naive())
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    struct Failing;
    impl BucketSource for Failing {
        fn stamp(&self, _: &StampRequest) -> Result<Version> {
            Err(Error::InvalidVersion("unreachable".into()))
        }
    }

    #[test]
    fn calendar_bucket_is_year_and_iso_week() {
        assert_eq!(calendar_bucket(date(2025, 9, 15)), 2538);
        assert_eq!(calendar_bucket(date(2026, 10, 18)), 2642);
        assert_eq!(calendar_bucket(date(2026, 1, 5)), 2602);
    }

    #[test]
    fn calendar_bucket_uses_iso_week_year_at_boundaries() {
        // 2027-01-01 falls in the 53rd week of 2026
        assert_eq!(calendar_bucket(date(2027, 1, 1)), 2653);
        // 2024-12-30 already belongs to the first week of 2025
        assert_eq!(calendar_bucket(date(2024, 12, 30)), 2501);
    }

    #[test]
    fn calendar_source_formats_version() {
        let source = CalendarBucketSource::fixed(date(2025, 9, 15));
        let request = StampRequest {
            head:   1,
            build:  4,
            suffix: Some("iOS"),
        };
        assert_eq!(source.stamp(&request).unwrap().to_string(), "1.2538.4+iOS");
        assert_eq!(source.bucket().unwrap(), 2538);
    }

    #[test]
    fn helper_output_version_line() {
        let output = "head: 1\nyearweek: 2538\nversion: 1.2538.4\nbuild: 4\n";
        assert_eq!(parse_helper_output(output), Some("1.2538.4"));
        assert_eq!(
            parse_helper_output("version: 1.2538.4+iOS\nversion: 9.9.9"),
            Some("1.2538.4+iOS")
        );
        assert_eq!(parse_helper_output("no version here\n  version: 1.2.3"), None);
        assert_eq!(parse_helper_output("version:\n"), None);
        assert_eq!(parse_helper_output(""), None);
    }

    #[test]
    fn display_bucket_falls_back_to_calendar() {
        let today = calendar_bucket(Local::now().date_naive());
        assert_eq!(bucket_for_display(&Failing), today);
        let fixed = CalendarBucketSource::fixed(date(2025, 9, 15));
        assert_eq!(bucket_for_display(&fixed), 2538);
    }

    #[test]
    fn missing_helper_is_an_error() {
        let source = HelperBucketSource::new("/nonexistent/headver-helper");
        assert!(matches!(
            source.bucket(),
            Err(Error::HelperSpawn { .. })
        ));
    }

    #[cfg(unix)]
    mod helper {
        use std::{fs, os::unix::fs::PermissionsExt};

        use pretty_assertions::assert_eq;
        use tempfile::TempDir;

        use super::super::*;

        fn script(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("helper.sh");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const STAMPER: &str = r#"
for arg in "$@"; do
  case "$arg" in
    head=*) head="${arg#head=}" ;;
    build=*) build="${arg#build=}" ;;
    suffix=*) suffix="+${arg#suffix=}" ;;
  esac
done
echo "head: $head"
echo "version: $head.2538.$build$suffix"
"#;

        #[test]
        fn stamps_through_helper() {
            let dir = TempDir::new().unwrap();
            let source = HelperBucketSource::new(script(&dir, STAMPER));
            assert_eq!(source.bucket().unwrap(), 2538);
            let request = StampRequest {
                head:   2,
                build:  7,
                suffix: Some("android"),
            };
            assert_eq!(
                source.stamp(&request).unwrap().to_string(),
                "2.2538.7+android"
            );
        }

        #[test]
        fn helper_without_version_line_fails() {
            let dir = TempDir::new().unwrap();
            let source = HelperBucketSource::new(script(&dir, "echo nothing useful"));
            assert!(matches!(
                source.bucket(),
                Err(Error::HelperNoVersion { .. })
            ));
        }

        #[test]
        fn helper_with_garbage_version_fails() {
            let dir = TempDir::new().unwrap();
            let source = HelperBucketSource::new(script(&dir, "echo 'version: soon'"));
            assert!(matches!(source.bucket(), Err(Error::InvalidVersion(_))));
        }
    }
}
