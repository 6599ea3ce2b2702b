//! "Import configuration": stage an uploaded router config, then run the
//! normalizer on it as a bounded one-shot job.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::error::{DashError, Result};
use crate::normalize;

const ACCEPTED_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Something that turns a source config into a processed table.
pub trait Normalizer {
    /// Returns a short success message.
    fn run(&self, input: &Path, output: &Path) -> impl Future<Output = Result<String>>;
}

/// Calls the normalizer in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessNormalizer;

impl Normalizer for InProcessNormalizer {
    async fn run(&self, input: &Path, output: &Path) -> Result<String> {
        let n = normalize::normalize_file(input, output)?;
        Ok(format!("processed {n} models"))
    }
}

/// Spawns `<program> <args..> <input> <output>` and waits at most `timeout`.
/// The child is killed if the bound is exceeded.
#[derive(Debug, Clone)]
pub struct SubprocessNormalizer {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl SubprocessNormalizer {
    /// Re-invoke the running binary's `normalize` subcommand.
    pub fn current_exe(timeout: Duration) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| DashError::Unknown(format!("cannot locate executable: {e}")))?;
        Ok(Self { program, args: vec!["normalize".to_string()], timeout })
    }
}

impl Normalizer for SubprocessNormalizer {
    async fn run(&self, input: &Path, output: &Path) -> Result<String> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        tracing::debug!(program = %self.program.display(), input = %input.display(), "spawning normalizer");

        let out = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return Err(DashError::Timeout(self.timeout)),
            Ok(Err(e)) => {
                return Err(DashError::Unknown(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                )))
            }
            Ok(Ok(out)) => out,
        };

        let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if out.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        let detail = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("normalizer exited with {}", out.status)
        };
        Err(DashError::Unknown(detail))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImportState {
    #[default]
    Idle,
    AwaitingUpload,
    FileStaged(PathBuf),
    Processing(PathBuf),
    Done(String),
    /// `staged` is kept so the user can retry or clear after a failed run.
    Error { message: String, staged: Option<PathBuf> },
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingUpload => "awaiting upload",
            Self::FileStaged(_) => "file staged",
            Self::Processing(_) => "processing",
            Self::Done(_) => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn staged(&self) -> Option<&Path> {
        match self {
            Self::FileStaged(p) | Self::Processing(p) => Some(p),
            Self::Error { staged, .. } => staged.as_deref(),
            _ => None,
        }
    }
}

/// Drives [`ImportState`]. Every method either performs its transition or
/// returns [`DashError::InvalidState`] and leaves the state alone.
#[derive(Debug)]
pub struct Importer {
    upload_dir: PathBuf,
    state: ImportState,
}

impl Importer {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self { upload_dir: upload_dir.into(), state: ImportState::Idle }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    fn invalid(&self, action: &str) -> DashError {
        DashError::InvalidState(format!("cannot {action} while {}", self.state.name()))
    }

    pub fn open_uploader(&mut self) -> Result<()> {
        match self.state {
            ImportState::Idle
            | ImportState::AwaitingUpload
            | ImportState::Done(_)
            | ImportState::Error { staged: None, .. } => {
                self.state = ImportState::AwaitingUpload;
                Ok(())
            }
            _ => Err(self.invalid("open uploader")),
        }
    }

    /// Copy `src` into the upload directory.
    pub fn stage(&mut self, src: &Path) -> Result<PathBuf> {
        if self.state != ImportState::AwaitingUpload {
            return Err(self.invalid("stage a file"));
        }
        match stage_file(src, &self.upload_dir) {
            Ok(dest) => {
                tracing::info!(file = %dest.display(), "staged upload");
                self.state = ImportState::FileStaged(dest.clone());
                Ok(dest)
            }
            Err(e) => {
                self.state = ImportState::Error { message: e.to_string(), staged: None };
                Err(e)
            }
        }
    }

    /// Drop the staged file (or cancel a pending upload).
    pub fn clear(&mut self) -> Result<()> {
        match &self.state {
            ImportState::AwaitingUpload => {}
            ImportState::FileStaged(p) | ImportState::Error { staged: Some(p), .. } => {
                remove_staged(p);
            }
            _ => return Err(self.invalid("clear")),
        }
        self.state = ImportState::Idle;
        Ok(())
    }

    /// Run `normalizer` on the staged file, writing `output`. On success the
    /// staged file is removed.
    pub async fn process<N: Normalizer>(&mut self, normalizer: &N, output: &Path) -> Result<String> {
        let staged = match &self.state {
            ImportState::FileStaged(p) | ImportState::Error { staged: Some(p), .. } => p.clone(),
            _ => return Err(self.invalid("process")),
        };
        self.state = ImportState::Processing(staged.clone());

        match normalizer.run(&staged, output).await {
            Ok(msg) => {
                remove_staged(&staged);
                let message = if msg.is_empty() {
                    "configuration imported".to_string()
                } else {
                    format!("configuration imported ({msg})")
                };
                tracing::info!("{message}");
                self.state = ImportState::Done(message.clone());
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(file = %staged.display(), "import failed: {e}");
                self.state = ImportState::Error { message: e.to_string(), staged: Some(staged) };
                Err(e)
            }
        }
    }

    /// Dismiss a finished run, returning its message. A failed run with a
    /// staged file goes back to `FileStaged`.
    pub fn acknowledge(&mut self) -> Result<String> {
        match std::mem::take(&mut self.state) {
            ImportState::Done(message) => Ok(message),
            ImportState::Error { message, staged } => {
                if let Some(p) = staged {
                    self.state = ImportState::FileStaged(p);
                }
                Ok(message)
            }
            other => {
                self.state = other;
                Err(self.invalid("acknowledge"))
            }
        }
    }
}

/// Copy a `.yaml`/`.yml` file into `upload_dir`, keeping its file name.
pub fn stage_file(src: &Path, upload_dir: &Path) -> Result<PathBuf> {
    let accepted = src
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e.to_lowercase().as_str()));
    if !accepted {
        return Err(DashError::MalformedInput(format!(
            "{} is not a .yaml or .yml file",
            src.display()
        )));
    }
    let name = src
        .file_name()
        .ok_or_else(|| DashError::MalformedInput(format!("{} has no file name", src.display())))?;
    std::fs::create_dir_all(upload_dir).map_err(|e| DashError::io(upload_dir, e))?;
    let dest = upload_dir.join(name);
    if is_same_file(src, &dest)? {
        // Copying onto itself truncates the file, and a staged file is
        // deleted after processing.
        return Err(DashError::MalformedInput(format!(
            "{} is already in the upload directory {}",
            src.display(),
            upload_dir.display()
        )));
    }
    std::fs::copy(src, &dest).map_err(|e| DashError::io(src, e))?;
    Ok(dest)
}

fn is_same_file(src: &Path, dest: &Path) -> Result<bool> {
    let src = std::fs::canonicalize(src).map_err(|e| DashError::io(src, e))?;
    match std::fs::canonicalize(dest) {
        Ok(dest) => Ok(src == dest),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DashError::io(dest, e)),
    }
}

fn remove_staged(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %path.display(), "could not remove staged file: {e}");
        }
    }
}
