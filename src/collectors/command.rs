use crate::error::CollectorError;
use log::debug;
use std::process::Command;

/// Runs an external program and returns its standard output
///
/// Arguments are passed as separate argv entries; nothing goes through a shell,
/// so pool names are never interpreted.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CollectorError>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CollectorError> {
        let command = display_command(program, args);
        debug!("Running {}", command);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| CollectorError::SubprocessSpawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CollectorError::NonZeroExit {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CollectorError::UnreadableOutput { command })
    }
}

/// Render a program and its arguments for log and error messages
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
