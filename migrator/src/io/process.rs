//! Run migration scripts as child processes with a timeout and bounded output.

use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// One script invocation: `shell[0] shell[1..] script`, run in `workdir`.
#[derive(Debug, Clone)]
pub struct ScriptRequest<'a> {
    pub shell: &'a [String],
    pub script: &'a Path,
    pub workdir: &'a Path,
    pub timeout: Duration,
    /// Keep at most this many bytes per stream; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

/// Bytes kept from one output stream plus the count of bytes dropped.
#[derive(Debug, Default)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: usize,
}

impl Captured {
    pub fn lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug)]
pub struct ScriptOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
}

fn build_command(request: &ScriptRequest<'_>) -> Result<Command> {
    let (program, args) = request
        .shell
        .split_first()
        .ok_or_else(|| anyhow!("script shell must not be empty"))?;
    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg(request.script)
        .current_dir(request.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // The script leads its own group so a timeout can take down its children too.
    #[cfg(unix)]
    cmd.process_group(0);
    Ok(cmd)
}

/// Run a script, capturing stdout/stderr on reader threads so full pipes never
/// stall the child.
///
/// A script that outlives `timeout` is killed together with everything it
/// started, and reported with `timed_out = true`.
#[instrument(skip_all, fields(script = %request.script.display(), timeout_secs = request.timeout.as_secs()))]
pub fn run_script(request: &ScriptRequest<'_>) -> Result<ScriptOutput> {
    let mut cmd = build_command(request)?;

    debug!("spawning script");
    let mut child = cmd.spawn().map_err(|err| {
        error!(err = %err, "failed to spawn script");
        anyhow!(err).context("spawn script")
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let limit = request.output_limit_bytes;
    let stdout_reader = thread::spawn(move || capture(stdout, limit));
    let stderr_reader = thread::spawn(move || capture(stderr, limit));

    let mut timed_out = false;
    let status = match child
        .wait_timeout(request.timeout)
        .context("wait for script")?
    {
        Some(status) => status,
        None => {
            warn!("script timed out, killing its process group");
            timed_out = true;
            terminate(&mut child)?;
            child.wait().context("wait for script after kill")?
        }
    };

    let stdout = join_capture(stdout_reader).context("collect stdout")?;
    let stderr = join_capture(stderr_reader).context("collect stderr")?;
    if stdout.truncated > 0 || stderr.truncated > 0 {
        warn!(
            stdout_truncated = stdout.truncated,
            stderr_truncated = stderr.truncated,
            "script output truncated"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "script finished");
    Ok(ScriptOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// Kill the script's whole process group. Children that inherited the output
/// pipes die with it, so the reader threads reach EOF.
#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<()> {
    let group = format!("-{}", child.id());
    let signalled = Command::new("kill")
        .args(["-s", "KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match signalled {
        Ok(status) if status.success() => Ok(()),
        other => {
            warn!(?other, "killing process group failed, killing script only");
            child.kill().context("kill script")
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<()> {
    child.kill().context("kill script")
}

fn join_capture(handle: thread::JoinHandle<Result<Captured>>) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

fn capture<R: Read>(mut reader: R, limit: usize) -> Result<Captured> {
    let mut captured = Captured::default();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read script output")?;
        if n == 0 {
            return Ok(captured);
        }
        let keep = n.min(limit.saturating_sub(captured.bytes.len()));
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.truncated += n - keep;
    }
}
