use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder substituted with the requested version in command arguments.
pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No description available for version {0}")]
    NotFound(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to spawn fetch command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to wait for fetch command '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Fetch command exited with {0}")]
    Exit(String),
    #[error("Fetch returned an empty description")]
    Empty,
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("Fetch worker ended without a result")]
    Disconnected,
}

/// Source of replacement descriptions. Transport, retries and authentication
/// are the implementor's concern; the gate only sees the description text.
pub trait DatasetFetcher: Send + Sync {
    /// Return the full YAML description recorded for `version`.
    ///
    /// Implementations that start external work must stop it once `timeout`
    /// has elapsed; [`fetch_with_timeout`] only stops waiting for the result.
    fn fetch(&self, version: &str, timeout: Duration) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

/// Reads `<dir>/<version>.yml` (or `.yaml`) from a local or mounted mirror.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    dir: PathBuf,
}

impl MirrorFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DatasetFetcher for MirrorFetcher {
    fn fetch(&self, version: &str, _timeout: Duration) -> Result<String, FetchError> {
        let candidate = ["yml", "yaml"]
            .iter()
            .map(|ext| self.dir.join(format!("{version}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| FetchError::NotFound(version.to_string()))?;
        let body = std::fs::read_to_string(&candidate)
            .map_err(|source| FetchError::Io { path: candidate.clone(), source })?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "mirror"
    }
}

/// Runs an external program (e.g. `curl`) and takes its stdout as the description.
/// The child is killed when it outlives the fetch timeout.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

impl CommandFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    fn expanded_args(&self, version: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace(VERSION_PLACEHOLDER, version)).collect()
    }
}

impl DatasetFetcher for CommandFetcher {
    fn fetch(&self, version: &str, timeout: Duration) -> Result<String, FetchError> {
        let mut child = Command::new(&self.program)
            .args(self.expanded_args(version))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| FetchError::Spawn { program: self.program.clone(), source })?;

        // Drain stdout concurrently so a large description cannot fill the pipe.
        let mut stdout = child.stdout.take().ok_or(FetchError::Disconnected)?;
        let reader = thread::spawn(move || {
            let mut body = Vec::new();
            stdout.read_to_end(&mut body).map(|_| body)
        });

        let wait_err =
            |source: std::io::Error| FetchError::Wait { program: self.program.clone(), source };
        let status = match wait_with_deadline(&mut child, timeout).map_err(wait_err)? {
            Some(status) => status,
            None => {
                warn!(program = %self.program, version, "killing fetch command after timeout");
                child.kill().map_err(wait_err)?;
                child.wait().map_err(wait_err)?;
                return Err(FetchError::Timeout(timeout));
            }
        };
        if !status.success() {
            return Err(FetchError::Exit(status.to_string()));
        }

        let stdout = reader.join().map_err(|_| FetchError::Disconnected)?.map_err(wait_err)?;
        let body = String::from_utf8_lossy(&stdout).to_string();
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Poll `child` until it exits or `timeout` elapses (`Ok(None)`).
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }
        thread::sleep((timeout - elapsed).min(Duration::from_millis(10)));
    }
}

/// Run `fetcher` on a worker thread and give up after `timeout`.
///
/// The timeout is also handed to the fetcher so it can stop its own work; on
/// expiry the worker is left to wind down and its result is dropped.
pub fn fetch_with_timeout(
    fetcher: Arc<dyn DatasetFetcher>,
    version: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let (tx, rx) = mpsc::channel();
    let requested = version.to_string();
    let name = fetcher.name();
    thread::Builder::new()
        .name(format!("symbind-fetch-{name}"))
        .spawn(move || {
            // The receiver may be gone after a timeout.
            let _ = tx.send(fetcher.fetch(&requested, timeout));
        })
        .map_err(|source| FetchError::Spawn { program: name.to_string(), source })?;

    debug!(fetcher = name, version, timeout_ms = timeout.as_millis() as u64, "fetching");
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(FetchError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(FetchError::Disconnected),
    }
}
