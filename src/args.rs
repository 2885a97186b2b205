use std::path::{Path, PathBuf};

use console::style;
use tracing::{debug, warn};

use crate::bucket::{BucketSource, CalendarBucketSource, HelperBucketSource};

pub fn get_store_path(dir: &Path, file: &str) -> PathBuf {
    let dir = Path::new(&std::env::current_dir().unwrap_or_default()).join(dir);
    if dir.exists() && !dir.is_dir() {
        eprintln!(
            "{}: {}",
            style("store directory is not a directory").red(),
            dir.display()
        );
        std::process::exit(-1);
    }
    let name = Path::new(file);
    if file.trim().is_empty() || name.file_name() != Some(name.as_os_str()) {
        eprintln!(
            "{}: {}",
            style("not a valid store file name").red(),
            style(file).red()
        );
        std::process::exit(-1);
    }
    dir.join(name)
}

/// Resolves the helper without checking it can run; a missing helper only
/// fails the commands that need a version from it.
pub fn get_helper(helper: &Path) -> PathBuf {
    if helper.components().count() > 1 {
        return Path::new(&std::env::current_dir().unwrap_or_default()).join(helper);
    }
    which::which(helper).unwrap_or_else(|e| {
        warn!(helper = %helper.display(), "couldn't find helper in PATH: {}", e);
        helper.to_owned()
    })
}

pub fn get_source(helper: Option<&Path>) -> Box<dyn BucketSource> {
    match helper {
        Some(helper) => {
            let source = HelperBucketSource::new(get_helper(helper));
            debug!(helper = %source.program().display(), "using version helper");
            Box::new(source)
        }
        None => {
            debug!("using calendar buckets");
            Box::new(CalendarBucketSource::today())
        }
    }
}

pub fn get_suffix(suffix: Option<&str>) -> Option<&str> {
    let suffix = suffix.map(str::trim).filter(|suffix| !suffix.is_empty())?;
    if suffix.chars().any(|c| c.is_whitespace() || c.is_control()) {
        eprintln!(
            "{}: {:?}",
            style("version suffix can't contain whitespace").red(),
            suffix
        );
        std::process::exit(-1);
    }
    Some(suffix)
}
