//! Locating and checking the djvused executable.

use log::{debug, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Exit status of djvused when invoked without arguments (usage message).
pub const USAGE_EXIT_STATUS: i32 = 10;

/// pkg-config package whose `exec_prefix` is the DjVuLibre install prefix.
const PKG_CONFIG_PACKAGE: &str = "ddjvuapi";

/// A djvused executable that passed the startup self-check.
///
/// The handle is created once and passed to every [`StreamEditor`]
/// explicitly. Besides the program it may carry leading arguments, so that a
/// wrapper such as `sh script` can stand in for the real tool.
///
/// [`StreamEditor`]: super::StreamEditor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolHandle {
    /// Find djvused and run the self-check.
    pub fn locate() -> Result<Self> {
        Self::checked(resolve_djvused())
    }

    /// Run the self-check on a specific program.
    pub fn checked(program: impl Into<PathBuf>) -> Result<Self> {
        let tool = Self::unchecked(program);
        tool.self_check()?;
        Ok(tool)
    }

    /// Create a handle without running anything.
    pub fn unchecked(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Create a handle for `program args...`, without the self-check.
    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Invoke the tool without arguments; a usable djvused prints its usage
    /// and exits with status 10.
    pub fn self_check(&self) -> Result<()> {
        let unusable = || Error::ToolUnusable {
            path: self.program.display().to_string(),
        };
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                warn!("cannot run {}: {}", self.program.display(), e);
                unusable()
            })?;
        match output.status.code() {
            Some(USAGE_EXIT_STATUS) => {
                debug!("{} passed the self-check", self.program.display());
                Ok(())
            }
            code => {
                warn!(
                    "{} exited with {:?} instead of {}",
                    self.program.display(),
                    code,
                    USAGE_EXIT_STATUS
                );
                Err(unusable())
            }
        }
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

fn executable_name() -> String {
    format!("djvused{}", std::env::consts::EXE_SUFFIX)
}

/// Pick the djvused to run: the one in the DjVuLibre prefix reported by
/// pkg-config, else the first on `PATH`, else the bare name.
pub fn resolve_djvused() -> PathBuf {
    if let Ok(prefix) = pkg_config_variable(PKG_CONFIG_PACKAGE, "exec_prefix") {
        let candidate = Path::new(&prefix).join("bin").join(executable_name());
        if candidate.is_file() {
            debug!("using djvused from pkg-config prefix {}", prefix);
            return candidate;
        }
        debug!("{} does not exist", candidate.display());
    }
    which::which(executable_name()).unwrap_or_else(|_| PathBuf::from(executable_name()))
}

/// Query `pkg-config --variable=<variable> <package>`.
pub fn pkg_config_variable(package: &str, variable: &str) -> Result<String> {
    let output = Command::new("pkg-config")
        .arg(format!("--variable={}", variable))
        .arg(package)
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Config(format!(
            "pkg-config {}: {}",
            package,
            stderr.trim()
        )));
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(Error::Config(format!(
            "pkg-config {} has no {} variable",
            package, variable
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unusable() {
        let tool = ToolHandle::unchecked("/nonexistent/redjvu/djvused");
        assert!(matches!(tool.self_check(), Err(Error::ToolUnusable { .. })));
    }

    #[test]
    fn test_resolve_falls_back_to_a_name() {
        let path = resolve_djvused();
        assert!(path.to_string_lossy().contains("djvused"));
    }

    #[test]
    fn test_with_args() {
        let tool = ToolHandle::with_args("sh", ["fake.sh"]);
        assert_eq!(tool.program(), Path::new("sh"));
        let command = tool.command();
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, [std::ffi::OsStr::new("fake.sh")]);
    }
}
