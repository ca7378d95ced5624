//! External program invocation for patchers and emulators.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error
    },

    #[error("{} exited with {status}", .program.display())]
    NonZeroExit {
        program: PathBuf,
        status: ExitStatus,
        stderr: String
    }
}

/// Resolve the program to an existing file
///
/// Paths are checked as given. A bare program name (`flips`, `mgba`)
/// that doesn't exist relative to the working dir is looked up in `PATH`.
pub fn resolve_executable(program: impl AsRef<Path>) -> Result<PathBuf, ProcessError> {
    let program = program.as_ref();

    if program.as_os_str().is_empty() {
        return Err(ProcessError::NotFound(program.to_path_buf()));
    }

    if program.is_file() {
        return Ok(program.to_path_buf());
    }

    if program.components().count() == 1 {
        if let Ok(path) = which::which(program) {
            return Ok(path);
        }
    }

    Err(ProcessError::NotFound(program.to_path_buf()))
}

/// Run the program to completion, succeeding only on zero exit status
pub fn run<I, S>(executable: impl AsRef<Path>, args: I) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>
{
    let program = resolve_executable(executable)?;
    let args = args.into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();

    tracing::info!("Running {:?} with args {:?}", program, args);

    let output = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source
        })?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        tracing::error!("{:?} exited with {}", program, output.status);
        tracing::debug!("stdout: {}", stdout.trim());
        tracing::debug!("stderr: {}", stderr.trim());

        return Err(ProcessError::NonZeroExit {
            program,
            status: output.status,
            stderr: stderr.trim().to_string()
        });
    }

    Ok(output)
}

/// Start the program without waiting for it to exit
///
/// The child is reaped by a background thread so it never lingers as a zombie.
pub fn spawn_detached<I, S>(executable: impl AsRef<Path>, args: I) -> Result<u32, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>
{
    let program = resolve_executable(executable)?;

    let mut child = Command::new(&program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source
        })?;

    let pid = child.id();

    tracing::info!("Started {:?} (pid {})", program, pid);

    std::thread::spawn(move || {
        match child.wait() {
            Ok(status) => tracing::debug!("Process {} finished with {}", pid, status),
            Err(err) => tracing::warn!("Failed to wait for process {}: {}", pid, err)
        }
    });

    Ok(pid)
}
