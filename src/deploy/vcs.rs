//! Version-control capability and its `git` CLI implementation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::DeployConfig;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {status}: {output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },

    #[error("HEAD is detached, no current branch")]
    DetachedHead,
}

/// Result of a pull. Failures are data, not errors: they only get logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    pub success: bool,
    /// Combined stdout and stderr.
    pub log: String,
}

#[async_trait]
pub trait VersionControl: Send + Sync + 'static {
    /// Name of the checked-out branch.
    async fn current_branch(&self) -> Result<String, VcsError>;

    /// Fetch and merge the configured remote branch.
    async fn pull(&self) -> PullOutcome;
}

/// Shells out to `git` in the repository directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    ssh_key: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl GitCli {
    pub fn from_config(config: &DeployConfig) -> Self {
        // safe.directory is compared against the resolved path.
        let repo_dir = std::fs::canonicalize(&config.repo_dir).unwrap_or_else(|_| config.repo_dir.clone());
        Self {
            binary: config.git_binary.clone(),
            repo_dir,
            remote: config.remote.clone(),
            branch: config.branch.clone(),
            ssh_key: config.ssh_key.clone(),
            home: config.home.clone(),
        }
    }

    /// Full argument list for `git <subcommand...>`.
    pub fn args(&self, subcommand: &[&str]) -> Vec<OsString> {
        let mut safe_directory = OsString::from("safe.directory=");
        safe_directory.push(&self.repo_dir);

        let mut args = vec![OsString::from("-c"), safe_directory];
        args.extend(subcommand.iter().map(OsString::from));
        args
    }

    /// Environment for every invocation. Never prompts for credentials.
    pub fn envs(&self) -> Vec<(&'static str, OsString)> {
        let mut envs = vec![("GIT_TERMINAL_PROMPT", OsString::from("0"))];
        if let Some(home) = &self.home {
            envs.push(("HOME", home.clone().into_os_string()));
        }
        if let Some(key) = &self.ssh_key {
            envs.push((
                "GIT_SSH_COMMAND",
                OsString::from(format!(
                    "ssh -i {} -o StrictHostKeyChecking=accept-new",
                    key.display()
                )),
            ));
        }
        envs
    }

    fn command(&self, subcommand: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(self.args(subcommand))
            .envs(self.envs())
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, subcommand: &[&str]) -> Result<std::process::Output, VcsError> {
        self.command(subcommand)
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                binary: self.binary.clone(),
                source,
            })
    }
}

fn combined_output(output: &std::process::Output) -> String {
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    log.trim_end().to_string()
}

#[async_trait]
impl VersionControl for GitCli {
    async fn current_branch(&self) -> Result<String, VcsError> {
        let output = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            return Err(VcsError::Failed {
                command: "rev-parse --abbrev-ref HEAD".into(),
                status: output.status.to_string(),
                output: combined_output(&output),
            });
        }

        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if branch == "HEAD" {
            return Err(VcsError::DetachedHead);
        }
        Ok(branch)
    }

    async fn pull(&self) -> PullOutcome {
        match self.run(&["pull", self.remote.as_str(), self.branch.as_str()]).await {
            Ok(output) => PullOutcome {
                success: output.status.success(),
                log: combined_output(&output),
            },
            Err(e) => PullOutcome {
                success: false,
                log: e.to_string(),
            },
        }
    }
}
