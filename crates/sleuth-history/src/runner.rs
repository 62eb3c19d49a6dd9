// Process execution for history access
//
// Design Decision: ProcessRunner is a trait so git can be replaced by a scripted
// runner in tests and by anything else that speaks the same argv interface.
// Design Decision: Output capture can be capped; past the cap the child is killed.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HistoryError, Result};

/// Captured output of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Stdout hit the capture limit and the process was killed
    pub truncated: bool,
}

impl ProcessOutput {
    /// Successful output with the given stdout
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }
}

/// Runs a program with arguments in a working directory
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture output
    ///
    /// A non-zero exit status is an error, unless output was truncated.
    async fn run(&self, program: &str, args: &[String], workdir: &Path) -> Result<ProcessOutput>;
}

/// Runs real processes through `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    max_output: Option<usize>,
}

impl TokioProcessRunner {
    /// Runner without an output cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap captured stdout at `bytes`
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output = Some(bytes);
        self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &str, args: &[String], workdir: &Path) -> Result<ProcessOutput> {
        debug!(program, ?args, workdir = %workdir.display(), "Running process");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HistoryError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            HistoryError::Io(std::io::Error::other("child stdout was not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            HistoryError::Io(std::io::Error::other("child stderr was not captured"))
        })?;

        let max_output = self.max_output;
        let read_stdout = async {
            let captured = read_capped(&mut stdout, max_output).await;
            if let Ok((_, true)) = &captured {
                // Stop the writer so stderr reaches EOF
                if let Err(e) = child.start_kill() {
                    warn!(program, "Failed to kill process after truncation: {}", e);
                }
            }
            captured
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        };

        let (captured, stderr) = tokio::join!(read_stdout, read_stderr);
        let (stdout, truncated) = captured?;
        let stderr = String::from_utf8_lossy(&stderr?).into_owned();
        let status = child.wait().await?;

        if !truncated && !status.success() {
            return Err(HistoryError::Exit {
                program: program.to_string(),
                code: status.code(),
                stderr,
            });
        }

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr,
            truncated,
        })
    }
}

/// Read to EOF, or until `limit` bytes; returns the bytes and whether it stopped early
async fn read_capped<R>(reader: &mut R, limit: Option<usize>) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok((out, false));
        }
        match limit {
            Some(limit) if out.len() + n > limit => {
                out.extend_from_slice(&chunk[..limit - out.len()]);
                return Ok((out, true));
            }
            _ => out.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Runner that answers from a script instead of spawning processes
///
/// Responses are keyed by the program followed by its arguments, joined with
/// spaces. Unscripted invocations fail with an exit error. Every invocation
/// is recorded.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, ScriptedResponse>>,
    calls: Mutex<Vec<String>>,
}

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Output(ProcessOutput),
    Exit { code: i32, stderr: String },
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with the given stdout
    pub fn respond(self, command: &str, stdout: impl Into<String>) -> Self {
        self.responses.lock().insert(
            command.to_string(),
            ScriptedResponse::Output(ProcessOutput::stdout(stdout)),
        );
        self
    }

    /// Answer `command` with stdout cut off at the capture limit
    pub fn respond_truncated(self, command: &str, stdout: impl Into<String>) -> Self {
        self.responses.lock().insert(
            command.to_string(),
            ScriptedResponse::Output(ProcessOutput {
                truncated: true,
                ..ProcessOutput::stdout(stdout)
            }),
        );
        self
    }

    /// Answer `command` with a failed exit
    pub fn fail(self, command: &str, code: i32, stderr: impl Into<String>) -> Self {
        self.responses.lock().insert(
            command.to_string(),
            ScriptedResponse::Exit {
                code,
                stderr: stderr.into(),
            },
        );
        self
    }

    /// Every command line seen so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String], _workdir: &Path) -> Result<ProcessOutput> {
        let command = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().push(command.clone());

        let response = self.responses.lock().get(&command).cloned();
        match response {
            Some(ScriptedResponse::Output(output)) => Ok(output),
            Some(ScriptedResponse::Exit { code, stderr }) => Err(HistoryError::Exit {
                program: program.to_string(),
                code: Some(code),
                stderr,
            }),
            None => Err(HistoryError::Exit {
                program: program.to_string(),
                code: None,
                stderr: format!("no scripted response for `{command}`"),
            }),
        }
    }
}
