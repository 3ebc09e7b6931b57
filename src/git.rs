use std::path::PathBuf;
use std::process::Command;

use crate::error::{HookError, Result};

/// Anything that can answer a git invocation with its standard output.
pub trait GitRunner {
    fn run(&self, args: &[&str]) -> Result<String>;
}

/// Runs the `git` executable inside a repository directory.
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        GitCli {
            repo_path: repo_path.into(),
        }
    }
}

impl GitRunner for GitCli {
    fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path);
        cmd.arg("--no-pager");
        cmd.args(args);

        log::debug!("running git {}", args.join(" "));

        let output = cmd
            .output()
            .map_err(|e| HookError::GitError(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(HookError::GitError(format!(
                "git {}: {}",
                args.first().copied().unwrap_or_default(),
                error.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
