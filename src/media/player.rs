/// External player and file manager launching
///
/// Children run on their own; a detached thread waits on each one so
/// it is reaped when it exits.
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::LaunchError;

fn spawn(program: &str, args: &[&std::ffi::OsStr]) -> Result<(), LaunchError> {
    let child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            player: program.to_string(),
            source: Arc::new(e),
        })?;
    reap(child);
    Ok(())
}

/// Wait for `child` in the background
fn reap(mut child: Child) -> Option<JoinHandle<Option<ExitStatus>>> {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("reap-{}", pid))
        .spawn(move || match child.wait() {
            Ok(status) => {
                debug!("child {} exited with {}", pid, status);
                Some(status)
            }
            Err(e) => {
                warn!("could not wait for child {}: {}", pid, e);
                None
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("no reaper for child {}: {}", pid, e);
            None
        }
    }
}

/// Start one player process per file, in the given order.
/// Stops at the first failure.
pub fn play_separately(player: &str, paths: &[PathBuf]) -> Result<usize, LaunchError> {
    if paths.is_empty() {
        return Err(LaunchError::NothingToPlay);
    }
    for path in paths {
        spawn(player, &[path.as_os_str()])?;
    }
    info!("started {} for {} file(s)", player, paths.len());
    Ok(paths.len())
}

/// Start a single player process with every file as a playlist
pub fn play_together(player: &str, paths: &[PathBuf]) -> Result<usize, LaunchError> {
    if paths.is_empty() {
        return Err(LaunchError::NothingToPlay);
    }
    let args: Vec<_> = paths.iter().map(|p| p.as_os_str()).collect();
    spawn(player, &args)?;
    info!("started {} with a playlist of {}", player, paths.len());
    Ok(paths.len())
}

/// Open the platform file manager at the file's folder
pub fn reveal(path: &Path) -> Result<(), LaunchError> {
    #[cfg(target_os = "windows")]
    {
        let select = std::ffi::OsString::from(format!("/select,{}", path.display()));
        spawn("explorer", &[select.as_os_str()])
    }
    #[cfg(target_os = "macos")]
    {
        spawn("open", &[std::ffi::OsStr::new("-R"), path.as_os_str()])
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let folder = path.parent().unwrap_or(path);
        spawn("xdg-open", &[folder.as_os_str()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_to_play() {
        assert!(matches!(
            play_separately("mpv", &[]),
            Err(LaunchError::NothingToPlay)
        ));
        assert!(matches!(
            play_together("mpv", &[]),
            Err(LaunchError::NothingToPlay)
        ));
    }

    #[test]
    fn test_missing_player_is_an_error() {
        let paths = vec![PathBuf::from("/tmp/a@1.mp4")];
        let err = play_separately("/definitely/not/a/player", &paths).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(err.to_string().contains("/definitely/not/a/player"));
    }

    #[cfg(unix)]
    #[test]
    fn test_finished_child_is_reaped() {
        let child = Command::new("true").spawn().unwrap();
        let status = reap(child).unwrap().join().unwrap();
        assert!(status.unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn test_spawns_player() {
        let paths = vec![PathBuf::from("a@1.mp4"), PathBuf::from("b@2.mp4")];
        assert_eq!(play_together("true", &paths).unwrap(), 2);
        assert_eq!(play_separately("true", &paths).unwrap(), 2);
    }
}
