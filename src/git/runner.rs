use crate::error::{GitkitError, Result};
use log::debug;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns git and hands back its stdout.
///
/// Any output on stderr counts as a failure, even when stdout is also
/// populated and the exit status is zero.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: OsString,
    timeout: Option<Duration>,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
            timeout: None,
        }
    }
}

impl GitRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program<S: Into<OsString>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run(&self, dir: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let command = self.describe(args);
        debug!("running `{command}` in {}", dir.display());

        let child = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitkitError::GitSpawn {
                command: command.clone(),
                source,
            })?;

        let (status, stdout, stderr) = match self.timeout {
            Some(timeout) => wait_with_deadline(child, timeout, &command)?,
            None => {
                let output = child
                    .wait_with_output()
                    .map_err(|source| GitkitError::GitSpawn {
                        command: command.clone(),
                        source,
                    })?;
                (output.status, output.stdout, output.stderr)
            }
        };

        check_output(command, status, stdout, stderr)
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }
}

fn check_output(
    command: String,
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
) -> Result<Vec<u8>> {
    if !stderr.is_empty() {
        debug!("`{command}` wrote {} bytes to stderr", stderr.len());
        return Err(GitkitError::GitStderr {
            command,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }
    if !status.success() {
        return Err(GitkitError::GitStatus {
            command,
            code: status.code(),
        });
    }
    debug!("`{command}` produced {} bytes", stdout.len());
    Ok(stdout)
}

// Both pipes are drained on their own threads so a chatty child cannot
// block on a full pipe while we poll for exit.
fn wait_with_deadline(
    mut child: Child,
    timeout: Duration,
    command: &str,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            debug!("killing `{command}` after {}", humantime::format_duration(timeout));
            let _ = child.kill();
            let _ = child.wait();
            return Err(GitkitError::GitTimeout {
                command: command.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok((status, collect(stdout)?, collect(stderr)?))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| io::Error::other("pipe reader thread panicked"))??;
            Ok(bytes)
        }
    }
}
