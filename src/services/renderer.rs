use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::models::{BarcodeConfig, StudioSettings};

/// First eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Errors a renderer can report for one generation request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Renderer program not configured")]
    NotConfigured,

    #[error("Renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Renderer process error: {0}")]
    Process(String),

    #[error("Renderer exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("Renderer output is not a PNG image")]
    InvalidImage,

    #[error("Renderer rejected configuration: {0}")]
    Rejected(String),
}

/// Turns a configuration into PNG bytes.
///
/// Implementations may be called concurrently; each call is independent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn generate(&self, config: &BarcodeConfig) -> Result<Vec<u8>, GenerationError>;
}

/// Stand-in used when no renderer program is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredRenderer;

#[async_trait]
impl Renderer for UnconfiguredRenderer {
    async fn generate(&self, _config: &BarcodeConfig) -> Result<Vec<u8>, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

/// Renders by piping the configuration JSON into an external program and
/// reading a PNG back from its stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: Utf8PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<Utf8PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_settings(settings: &StudioSettings) -> Result<Self, GenerationError> {
        if !settings.has_renderer() {
            return Err(GenerationError::NotConfigured);
        }
        Ok(Self::new(
            settings.renderer_program.trim(),
            settings.renderer_args.clone(),
            settings.render_timeout(),
        ))
    }

    pub fn program(&self) -> &Utf8PathBuf {
        &self.program
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn generate(&self, config: &BarcodeConfig) -> Result<Vec<u8>, GenerationError> {
        let payload =
            serde_json::to_vec(config).map_err(|e| GenerationError::Rejected(e.to_string()))?;

        tracing::debug!("Executing renderer: {} {:?}", self.program, self.args);
        let start = Instant::now();

        let mut child = Command::new(self.program.as_std_path())
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Process(format!("failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| GenerationError::Process(format!("failed to write stdin: {e}")))?;
            // Dropping stdin closes the pipe so the renderer sees EOF
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!("Renderer timed out after {:?}", self.timeout);
                GenerationError::Timeout(self.timeout)
            })?
            .map_err(|e| GenerationError::Process(e.to_string()))?;

        tracing::debug!(
            "Renderer completed in {:.2}s with status {}",
            start.elapsed().as_secs_f32(),
            output.status
        );

        if !output.status.success() {
            return Err(GenerationError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !is_png(&output.stdout) {
            return Err(GenerationError::InvalidImage);
        }
        Ok(output.stdout)
    }
}
