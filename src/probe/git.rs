//! Git Probe
//!
//! Checks that a file exists at a given ref of a remote repository by
//! fetching that single commit into a scratch directory with the `git` CLI.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{record_check, Probe};
use crate::config::GitTarget;
use crate::error::{ProbeError, ProbeResult};
use crate::observability::MetricSink;
use crate::outcome::Outcome;

/// Username paired with the token for HTTP basic auth
const TOKEN_USER: &str = "oauth2";

/// Remote file lookup
#[async_trait]
pub trait GitClient: Send + Sync {
    async fn file_exists(&self, target: &GitTarget) -> ProbeResult<()>;
}

/// `Authorization` header value for a token
pub(crate) fn auth_header(token: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", TOKEN_USER, token));
    format!("Authorization: Basic {}", encoded)
}

/// Ref to fetch, `HEAD` when unset
pub(crate) fn fetch_ref(target: &GitTarget) -> &str {
    if target.revision.is_empty() {
        "HEAD"
    } else {
        &target.revision
    }
}

/// [`GitClient`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
        }
    }

    /// Use a specific git binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, dir: &Path, args: &[&str], token: Option<&str>) -> ProbeResult<()> {
        let subcommand = args.first().copied().unwrap_or_default().to_string();

        let mut cmd = Command::new(&self.program);
        cmd.current_dir(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Passed through the environment so the token stays out of argv
        if let Some(token) = token {
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", auth_header(token));
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ProbeError::Git {
                command: subcommand.clone(),
                message: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| ProbeError::Git {
                command: subcommand.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProbeError::Git {
                command: subcommand,
                message: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }

        Ok(())
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn file_exists(&self, target: &GitTarget) -> ProbeResult<()> {
        let scratch = tempfile::tempdir().map_err(|e| ProbeError::Git {
            command: "init".to_string(),
            message: e.to_string(),
        })?;
        let dir = scratch.path();
        let token = Some(target.token.as_str()).filter(|t| !t.is_empty());

        self.run(dir, &["init", "--quiet"], None).await?;
        self.run(
            dir,
            &["fetch", "--quiet", "--depth", "1", target.url.as_str(), fetch_ref(target)],
            token,
        )
        .await?;

        let object = format!("FETCH_HEAD:{}", target.path);
        self.run(dir, &["cat-file", "-e", &object], None)
            .await
            .map_err(|_| ProbeError::FileNotFound(target.path.clone()))
    }
}

/// Probe for a file in a git repository
pub struct GitProbe {
    target: GitTarget,
    git: Arc<dyn GitClient>,
    sink: MetricSink,
}

impl GitProbe {
    pub fn new(target: &GitTarget, git: Arc<dyn GitClient>, sink: MetricSink) -> Self {
        Self {
            target: target.clone(),
            git,
            sink,
        }
    }
}

#[async_trait]
impl Probe for GitProbe {
    fn name(&self) -> &str {
        &self.target.name
    }

    fn kind(&self) -> &'static str {
        "git"
    }

    async fn execute(&self, cancel: &CancellationToken) -> Outcome {
        record_check(
            &self.target.name,
            self.kind(),
            &self.sink,
            cancel,
            self.git.file_exists(&self.target),
        )
        .await
    }
}
