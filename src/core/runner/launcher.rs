//! Launching the external analysis tool.

use crate::error::InvocationError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Trait for anything that can run the analysis on one config file
///
/// Implement this to swap the process launch out (e.g., in tests).
pub trait Launcher: Send + Sync {
    /// Run the analysis for `config` and wait for it to return.
    fn launch(&self, config: &Path) -> Result<(), InvocationError>;
}

/// Runs `<program> [<script>] <config>` as a child process.
///
/// A run counts as done once the process was started and waited on. The
/// exit status is logged but not inspected, so a tool that exits non-zero
/// still has its config relocated.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: OsString,
    script: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            script: None,
        }
    }

    /// Script passed to the program ahead of the config path
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, config: &Path) -> Result<(), InvocationError> {
        let mut command = Command::new(&self.program);
        if let Some(script) = &self.script {
            command.arg(script);
        }
        command.arg(config);

        let status = command.status().map_err(|source| InvocationError::Launch {
            config: config.to_path_buf(),
            source,
        })?;

        if status.success() {
            debug!(config = %config.display(), "Analysis returned");
        } else {
            warn!(
                config = %config.display(),
                status = %status,
                "Analysis exited unsuccessfully; exit status is not used to decide completion"
            );
        }
        Ok(())
    }
}
