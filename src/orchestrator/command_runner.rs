use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// Captured result of one shell command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed or died from a signal
    pub exit_code: Option<i32>,
    /// stdout and stderr interleaved in arrival order
    pub output: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn last_line(&self) -> Option<&str> {
        self.output.lines().rev().map(str::trim).find(|l| !l.is_empty())
    }
}

/// Runs shell commands with a hard wall-clock timeout
///
/// Each command runs under `sh -c` in its own process group; on timeout the
/// whole group is killed so nothing it spawned keeps running.
#[derive(Debug, Default)]
pub struct CommandRunner {}

impl CommandRunner {
    pub fn new() -> Self {
        Self {}
    }

    /// Run `command_line` to completion or until `timeout` elapses
    pub async fn run(&self, command_line: &str, timeout: Duration) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(command = command_line, timeout_secs = timeout.as_secs(), "spawning");

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn 'sh -c {}'", command_line))?;

        let mut output = String::new();
        let finished = tokio::time::timeout(timeout, collect(&mut child, &mut output)).await;

        let (exit_code, timed_out) = match finished {
            Ok(Ok(code)) => (code, false),
            Ok(Err(e)) => {
                kill_group(&mut child).await;
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(command = command_line, "timed out, killing process group");
                kill_group(&mut child).await;
                (None, true)
            }
        };

        Ok(CommandOutput {
            exit_code,
            output,
            timed_out,
            duration: started.elapsed(),
        })
    }
}

/// Read stdout and stderr concurrently until both close, then wait for exit
///
/// Lines are split on raw bytes; anything that is not UTF-8 is replaced
/// rather than treated as a read failure.
async fn collect(child: &mut Child, output: &mut String) -> Result<Option<i32>> {
    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let mut stdout_reader = BufReader::new(stdout).split(b'\n');
    let mut stderr_reader = BufReader::new(stderr).split(b'\n');
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            segment = stdout_reader.next_segment(), if !stdout_done => {
                match segment.context("Failed to read stdout")? {
                    Some(bytes) => push_line(output, &bytes),
                    None => stdout_done = true,
                }
            }
            segment = stderr_reader.next_segment(), if !stderr_done => {
                match segment.context("Failed to read stderr")? {
                    Some(bytes) => push_line(output, &bytes),
                    None => stderr_done = true,
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok(status.code())
}

fn push_line(output: &mut String, bytes: &[u8]) {
    let line = String::from_utf8_lossy(bytes);
    output.push_str(line.strip_suffix('\r').unwrap_or(&line));
    output.push('\n');
}

async fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child leads its own group, so pgid == pid.
        unsafe {
            if libc::killpg(pid as i32, libc::SIGKILL) == -1 {
                let _ = child.start_kill();
            }
        }
    }
    #[cfg(not(unix))]
    let _ = child.start_kill();

    let _ = child.wait().await;
}
