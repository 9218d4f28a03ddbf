use crate::domain::{CigaleError, CigaleResult};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::process::Command;
use tracing::info;

pub const DEFAULT_EXECUTABLE: &str = "pcigale";

/// The three commands of the external program used by a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcigaleStep {
    Init,
    Genconf,
    Run,
}

impl PcigaleStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Genconf => "genconf",
            Self::Run => "run",
        }
    }
}

impl Display for PcigaleStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub const fn success() -> Self {
        Self { code: Some(0) }
    }

    pub const fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    pub fn describe(&self) -> String {
        self.code.map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        )
    }
}

pub trait ProcessRunner {
    /// Program name reported in diagnostics.
    fn program(&self) -> &str;

    fn run(&self, step: PcigaleStep, working_dir: &Path) -> CigaleResult<ExitOutcome>;
}

/// Runs `<executable> <step>` as a blocking child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProcessRunner {
    executable: String,
}

impl SystemProcessRunner {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn program(&self) -> &str {
        &self.executable
    }

    fn run(&self, step: PcigaleStep, working_dir: &Path) -> CigaleResult<ExitOutcome> {
        info!(
            program = %self.executable,
            %step,
            working_dir = %working_dir.display(),
            "invoking external command"
        );
        let status = Command::new(&self.executable)
            .current_dir(working_dir)
            .arg(step.as_str())
            .status()
            .map_err(|source| CigaleError::ProcessSpawn {
                program: self.executable.clone(),
                step: step.as_str(),
                source,
            })?;

        Ok(ExitOutcome {
            code: status.code(),
        })
    }
}
