// Git plumbing for libraries kept under version control. Every command runs
// with the library as its working directory; a non-zero exit is an error.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Git { dir: dir.into() }
    }

    /// Whether the directory sits inside a git work tree.
    pub fn is_repository(&self) -> bool {
        self.output(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Bring the library up to date with its upstream.
    pub fn sync(&self) -> Result<()> {
        info!(dir = %self.dir.display(), "syncing library");
        self.run(&["fetch"])?;
        self.run(&["rebase", "--autostash"])
    }

    /// Whether there is anything to commit.
    pub fn has_changes(&self) -> Result<bool> {
        let out = self.checked(&["status", "--porcelain"])?;
        Ok(!out.stdout.is_empty())
    }

    /// Commit every change in the library and push it.
    pub fn publish(&self, message: &str) -> Result<()> {
        if !self.has_changes()? {
            info!("nothing to commit");
            return Ok(());
        }
        self.run(&["add", "-A", "."])?;
        self.run(&["commit", "-m", message])?;
        self.run(&["push"])
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(dir = %self.dir.display(), "git {}", args.join(" "));
        Ok(Command::new("git").args(args).current_dir(&self.dir).output()?)
    }

    fn checked(&self, args: &[&str]) -> Result<Output> {
        let out = self.output(args)?;
        if !out.status.success() {
            return Err(Error::Command {
                program: format!("git {}", args.join(" ")),
                status: out.status.to_string(),
            });
        }
        Ok(out)
    }

    /// Run with inherited stdio so the user sees git's own output.
    fn run(&self, args: &[&str]) -> Result<()> {
        debug!(dir = %self.dir.display(), "git {}", args.join(" "));
        let status = Command::new("git").args(args).current_dir(&self.dir).status()?;
        if !status.success() {
            return Err(Error::Command {
                program: format!("git {}", args.join(" ")),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
