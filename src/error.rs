use std::{io, path::PathBuf, process::ExitStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("couldn't write version store {}: {source}", path.display())]
    Store {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't run version helper {}: {source}", program.display())]
    HelperSpawn {
        program: PathBuf,
        #[source]
        source:  io::Error,
    },
    #[error("version helper {} printed no version line ({status})", program.display())]
    HelperNoVersion { program: PathBuf, status: ExitStatus },
    #[error("build counter of {0} is exhausted, start a new head")]
    BuildOverflow(String),
    #[error("not a valid version: {0:?}")]
    InvalidVersion(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
