/// Error types
///
/// All of these travel inside UI messages, so they are `Clone` and keep
/// their I/O sources behind an `Arc`.
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A directory scan that could not complete. The previous index is kept.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("cannot read directory {path}: {source}")]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed while walking {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("no directory selected")]
    NoDirectory,
}

/// Renaming one record's file failed. Other items in a batch are unaffected.
#[derive(Debug, Clone, Error)]
pub enum RenameError {
    #[error("cannot rename {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{0} already exists")]
    TargetExists(PathBuf),

    #[error("{0} is not in the catalog")]
    NotInIndex(PathBuf),

    #[error("a scan is running, try again when it finishes")]
    ScanInProgress,

    #[error("{0:?} would leave its folder")]
    PathSeparator(String),
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("cannot determine a configuration directory")]
    NoConfigDir,

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("invalid configuration in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    #[error("nothing to play")]
    NothingToPlay,

    #[error("cannot start player {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: Arc<io::Error>,
    },
}
