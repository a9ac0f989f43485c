use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time;
use tracing::{debug, warn};

use crate::{error::Error, types::ResourceLimits, types::INFRA_EXIT_CODE, Result};

/// How long output readers may keep draining once the process tree is gone
const DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// Backoff bounds while polling for the child's exit
const EXIT_POLL_MIN: Duration = Duration::from_millis(1);
const EXIT_POLL_MAX: Duration = Duration::from_millis(25);

/// Captured result of one child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own
    Completed(ProcessOutput),
    /// The deadline passed and the process group was killed. Carries whatever
    /// output was produced before the kill.
    TimedOut(ProcessOutput),
}

/// Spawns toolchain processes with a wall-clock deadline.
///
/// Every child is the leader of its own process group, so a timeout kills
/// the compiler or program together with anything it forked.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    limits: ResourceLimits,
}

impl ProcessRunner {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Run `program` with `args` inside `cwd`, feeding `stdin` if given.
    pub async fn run<S: AsRef<OsStr>>(
        &self,
        program: impl AsRef<OsStr>,
        args: &[S],
        cwd: &Path,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<RunOutcome> {
        self.run_with_env(program, args, cwd, stdin, timeout, &[]).await
    }

    /// Like [`run`](Self::run), with extra environment variables set for the
    /// child on top of the inherited environment.
    pub async fn run_with_env<S: AsRef<OsStr>>(
        &self,
        program: impl AsRef<OsStr>,
        args: &[S],
        cwd: &Path,
        stdin: Option<&str>,
        timeout: Duration,
        env: &[(&str, &OsStr)],
    ) -> Result<RunOutcome> {
        let program_path = resolve_program(program.as_ref())?;
        let started = Instant::now();
        let deadline = time::Instant::now() + timeout;

        debug!("Runner - Command: {}", program_path.display());
        debug!(
            "Runner - Args: {:?}",
            args.iter().map(|a| a.as_ref()).collect::<Vec<_>>()
        );
        debug!("Runner - Working dir: {}", cwd.display());

        let mut command = Command::new(&program_path);
        command
            .args(args)
            .envs(env.iter().copied())
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        #[cfg(target_os = "linux")]
        {
            use nix::sys::resource::{setrlimit, Resource};

            let file_size = self.limits.file_size;
            let cpu_time = self.limits.cpu_time;

            unsafe {
                command.pre_exec(move || {
                    setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)
                        .map_err(|e| io::Error::other(format!("Failed to set file size limit: {}", e)))?;
                    setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time)
                        .map_err(|e| io::Error::other(format!("Failed to set CPU time limit: {}", e)))?;
                    Ok(())
                });
            }
        }

        let mut child = command.spawn().map_err(|e| {
            Error::Process(format!(
                "Failed to spawn {}: {}",
                program_path.display(),
                e
            ))
        })?;
        // From here on, dropping this future still takes the whole group down.
        let mut group = GroupGuard::new(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Process("stderr was not captured".to_string()))?;
        let limit = self.limits.max_output_bytes;
        let stdout_capture = SharedCapture::default();
        let stderr_capture = SharedCapture::default();
        let stdout_task = tokio::spawn(read_capped(stdout, limit, stdout_capture.clone()));
        let stderr_task = tokio::spawn(read_capped(stderr, limit, stderr_capture.clone()));
        group.watch(stdout_task.abort_handle());
        group.watch(stderr_task.abort_handle());

        // Feed stdin from its own task so a child that writes before it reads
        // cannot fill its output pipe while we block on its input pipe.
        let stdin_task = match (child.stdin.take(), stdin) {
            (Some(mut pipe), Some(input)) => {
                let input = input.to_owned();
                let task = tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(input.as_bytes()).await {
                        debug!("Child closed stdin early: {}", e);
                    }
                });
                group.watch(task.abort_handle());
                Some(task)
            }
            _ => None,
        };

        let exited = match time::timeout_at(deadline, wait_exited(&mut child)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                return Err(Error::Process(format!("Failed to wait for process: {}", e)));
            }
            Err(_) => false,
        };

        // The leader is still unreaped, so its pid cannot have been recycled
        // and the group id names this run only. Background descendants are
        // reaped on every path, not only on timeout.
        group.kill();
        if !exited {
            warn!(
                "Process {} exceeded {:?}, killed its process group",
                program_path.display(),
                timeout
            );
        }
        let status = child
            .wait()
            .await
            .map_err(|e| Error::Process(format!("Failed to reap process: {}", e)))?;
        if let Some(task) = stdin_task {
            task.abort();
        }

        let (stdout, stderr) = tokio::join!(
            collect_stream(stdout_task, &stdout_capture, limit),
            collect_stream(stderr_task, &stderr_capture, limit)
        );

        let elapsed = started.elapsed();
        Ok(if exited {
            RunOutcome::Completed(ProcessOutput {
                stdout,
                stderr,
                exit_code: exit_code(status),
                elapsed,
            })
        } else {
            RunOutcome::TimedOut(ProcessOutput {
                stdout,
                stderr,
                exit_code: INFRA_EXIT_CODE,
                elapsed,
            })
        })
    }

    /// Returns true when `program args...` can be spawned and exits with 0
    /// within `timeout`.
    pub async fn probe(&self, program: &str, args: &[&str], timeout: Duration) -> bool {
        if resolve_program(OsStr::new(program)).is_err() {
            return false;
        }
        let cwd = std::env::temp_dir();
        match self.run(program, args, &cwd, None, timeout).await {
            Ok(RunOutcome::Completed(output)) => output.success(),
            Ok(RunOutcome::TimedOut(_)) => {
                warn!("Probe of {} timed out", program);
                false
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", program, e);
                false
            }
        }
    }
}

/// Bare names are looked up on PATH, anything with a separator is used as is.
fn resolve_program(program: &OsStr) -> Result<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return Ok(path.to_path_buf());
    }
    which::which(program).map_err(|_| {
        Error::ToolchainMissing(format!(
            "{} was not found on PATH",
            program.to_string_lossy()
        ))
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    INFRA_EXIT_CODE
}

/// Resolves once the child has exited without reaping it, so its pid stays
/// reserved until the group has been killed.
#[cfg(target_os = "linux")]
async fn wait_exited(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT | WaitPidFlag::WNOHANG;
    let mut interval = EXIT_POLL_MIN;
    loop {
        match waitid(Id::Pid(Pid::from_raw(pid as i32)), flags) {
            Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => {}
            Ok(_) => return Ok(()),
            Err(e) => return Err(io::Error::from(e)),
        }
        time::sleep(interval).await;
        interval = (interval * 2).min(EXIT_POLL_MAX);
    }
}

#[cfg(not(target_os = "linux"))]
async fn wait_exited(child: &mut Child) -> io::Result<()> {
    child.wait().await.map(|_| ())
}

/// Owns the child's process group until `run` has reaped it. Dropping the
/// guard early (a cancelled or aborted caller) kills the group and stops the
/// pipe tasks.
struct GroupGuard {
    pgid: Option<u32>,
    tasks: Vec<AbortHandle>,
}

impl GroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self {
            pgid,
            tasks: Vec::new(),
        }
    }

    fn watch(&mut self, task: AbortHandle) {
        self.tasks.push(task);
    }

    /// SIGKILL the group once; later calls are no-ops
    fn kill(&mut self) {
        kill_process_group(self.pgid.take());
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            debug!("Run abandoned, killing process group {}", pgid);
        }
        self.kill();
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Bytes read from one stream so far
#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
}

type SharedCapture = Arc<Mutex<Capture>>;

fn lock(capture: &SharedCapture) -> MutexGuard<'_, Capture> {
    capture.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
    capture: SharedCapture,
) -> io::Result<()> {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut capture = lock(&capture);
        let room = limit.saturating_sub(capture.bytes.len());
        if n > room {
            capture.truncated = true;
        }
        // Past the cap the stream is still drained so the child never blocks.
        capture.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
}

async fn collect_stream(
    task: JoinHandle<io::Result<()>>,
    capture: &SharedCapture,
    limit: usize,
) -> String {
    let abort = task.abort_handle();
    match time::timeout(DRAIN_GRACE, task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Failed to read process output: {}", e),
        Ok(Err(e)) => warn!("Output reader task failed: {}", e),
        Err(_) => {
            // A descendant outside the process group still holds the pipe.
            abort.abort();
            warn!("Output stream still open after process exit, keeping what was read");
        }
    }

    let capture = lock(capture);
    let mut text = String::from_utf8_lossy(&capture.bytes).into_owned();
    if capture.truncated {
        text.push_str(&format!("\n[output truncated after {} bytes]", limit));
    }
    text
}
