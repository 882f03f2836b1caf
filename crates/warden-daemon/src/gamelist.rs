//! Wrapper around the game-list discovery binary.
//!
//! The binary joins the game network, writes the current game list as JSON
//! to the path given as its only argument, and keeps running. We poll for
//! the file until a timeout, then terminate the child.
//!
//! - nonzero exit before the file appears: hard failure, stderr attached
//! - file never appears: no games, not an error

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use warden_types::gamelist::{GameDescriptor, GameListDocument};

/// Interval between checks for the side file.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Grace period for the binary to finish writing once the file appears.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// How long to wait for the child to exit after killing it.
const KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Game-list wrapper errors.
#[derive(Debug, thiserror::Error)]
pub enum GameListError {
    #[error("game-list binary not found at {0}")]
    BinaryNotFound(PathBuf),

    #[error("game-list binary failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed game list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result of one discovery run.
#[derive(Debug, Clone, PartialEq)]
pub enum GameListOutcome {
    /// The side file was written.
    Games(Vec<GameDescriptor>),
    /// Timed out waiting for the side file.
    NoGames,
}

/// Run the discovery binary and collect its game list.
pub async fn fetch_games(
    binary: &Path,
    timeout: Duration,
) -> Result<GameListOutcome, GameListError> {
    if !binary.exists() {
        return Err(GameListError::BinaryNotFound(binary.to_path_buf()));
    }

    let workdir = tempfile::tempdir()?;
    let output = workdir.path().join("gamelist.json");
    let stderr_path = workdir.path().join("stderr.log");
    let stderr_log = std::fs::File::create(&stderr_path)?;

    let mut child = Command::new(binary)
        .arg(&output)
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_log))
        .kill_on_drop(true)
        .spawn()?;

    let result = collect(&mut child, &output, &stderr_path, timeout).await;
    terminate(&mut child).await;
    result
}

async fn collect(
    child: &mut Child,
    output: &Path,
    stderr_path: &Path,
    timeout: Duration,
) -> Result<GameListOutcome, GameListError> {
    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if output.exists() {
            sleep(SETTLE_DELAY).await;
            break;
        }
        if Instant::now() >= deadline {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    if let Some(status) = child.try_wait()? {
        if !status.success() {
            let stderr = read_stderr(stderr_path).await;
            return Err(GameListError::Failed {
                status: status.to_string(),
                stderr,
            });
        }
    }

    if !output.exists() {
        let stderr = read_stderr(stderr_path).await;
        if !stderr.is_empty() {
            debug!(%stderr, "Game-list binary output");
        }
        debug!("No games found (timeout waiting for network/games)");
        return Ok(GameListOutcome::NoGames);
    }

    let data = tokio::fs::read(output).await?;
    let document: GameListDocument = serde_json::from_slice(&data)?;
    Ok(GameListOutcome::Games(document.into_games()))
}

async fn read_stderr(path: &Path) -> String {
    tokio::fs::read_to_string(path)
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Kill the child if it is still running and reap it.
async fn terminate(child: &mut Child) {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill game-list binary: {e}");
        return;
    }
    if tokio::time::timeout(KILL_TIMEOUT, child.wait()).await.is_err() {
        warn!("Game-list binary did not exit after kill");
    }
}
