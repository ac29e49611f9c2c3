//! Subprocess execution with live output streaming
//!
//! Commands run in their own process group with stderr merged into stdout.
//! Output is echoed line by line while the command runs and captured in
//! full for the caller. A timeout terminates the whole group, so shells and
//! their children go down together.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::{debug, info, warn};

use crate::error::{ExecError, Result};

/// How long a command may keep running after its output closes
pub const DEFAULT_REAP_GRACE: Duration = Duration::from_secs(10);

/// How long a timed-out group gets between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

const REAP_POLL: Duration = Duration::from_millis(50);

// Red foreground SGR sequence some tools wrap their error lines in
static ANSI_RED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[31m").expect("static pattern is a valid regex"));

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Capture output without echoing it
    pub suppress_echo: bool,

    /// Bytes prepended to every output line
    pub line_prefix: Vec<u8>,

    /// Remove red ANSI color codes from every line
    pub strip_ansi_red: bool,

    /// Terminate the process group after this long
    pub timeout: Option<Duration>,

    /// Working directory of the command
    pub current_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suppress_echo(mut self, suppress: bool) -> Self {
        self.suppress_echo = suppress;
        self
    }

    /// Prefix every line with `[label]: `
    pub fn with_prefix(mut self, label: &str) -> Self {
        self.line_prefix = format!("[{}]: ", label).into_bytes();
        self
    }

    pub fn with_strip_ansi_red(mut self, strip: bool) -> Self {
        self.strip_ansi_red = strip;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout in whole seconds; `0` means no timeout
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout((secs > 0).then(|| Duration::from_secs(secs)))
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Result of a command that ran to completion (or was terminated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `128 + n` when terminated by signal `n`
    pub exit_code: i32,

    /// Full output as echoed, prefix included
    pub output: String,

    /// The timeout fired before the command finished
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Something that can run a command line to completion
///
/// `argv[0]` is the program. A command that runs and exits non-zero is a
/// successful call returning a failed [`CommandOutput`]; `Err` is reserved
/// for commands that could not be run or reaped at all.
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String], options: &RunOptions) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, argv: &[String], options: &RunOptions) -> Result<CommandOutput> {
        (**self).run(argv, options)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, argv: &[String], options: &RunOptions) -> Result<CommandOutput> {
        (**self).run(argv, options)
    }
}

/// Runs real subprocesses
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    reap_grace: Duration,
    kill_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            reap_grace: DEFAULT_REAP_GRACE,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on the wait for exit once output has closed
    pub fn with_reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = grace;
        self
    }

    /// Delay between SIGTERM and SIGKILL after a timeout
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String], options: &RunOptions) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
        debug!("running: {}", argv.join(" "));

        let (reader, writer) = io::pipe()?;

        // The command (and with it our copies of the write end) must be
        // dropped before reading, or the reader never sees EOF.
        let mut child = {
            let mut command = Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer)
                .process_group(0);
            if let Some(dir) = &options.current_dir {
                command.current_dir(dir);
            }
            command.envs(options.env.iter().map(|(k, v)| (k, v)));

            command.spawn().map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?
        };

        // process_group(0) makes the child its own group leader
        let pgid = child.id() as i32;
        let timer = options
            .timeout
            .map(|timeout| KillTimer::start(pgid, timeout, self.kill_grace));

        let pumped = pump(reader, options);
        let timed_out = timer.map(KillTimer::cancel).unwrap_or(false);
        let (status, output) = settle(&mut child, pgid, pumped, self.reap_grace, program)?;

        let exit_code = exit_code(status);
        if timed_out {
            warn!("'{}' timed out and was terminated", program);
        } else {
            debug!("'{}' exited with code {}", program, exit_code);
        }

        Ok(CommandOutput {
            exit_code,
            output,
            timed_out,
        })
    }
}

/// Read lines until EOF, echoing and capturing each one
fn pump(reader: impl Read, options: &RunOptions) -> io::Result<String> {
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut raw = Vec::new();
    let stdout = io::stdout();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }

        let line = decorate(&raw, options);
        if !options.suppress_echo {
            let mut out = stdout.lock();
            out.write_all(&line)?;
            out.flush()?;
        }
        captured.push_str(&String::from_utf8_lossy(&line));
    }

    Ok(captured)
}

fn decorate(raw: &[u8], options: &RunOptions) -> Vec<u8> {
    let mut line = Vec::with_capacity(options.line_prefix.len() + raw.len());
    line.extend_from_slice(&options.line_prefix);
    line.extend_from_slice(raw);

    if options.strip_ansi_red {
        line = ANSI_RED.replace_all(&line, &b""[..]).into_owned();
    }
    line
}

/// Reap the child once reading has stopped
///
/// A failed read leaves the group running with nobody draining its
/// output, so it is killed and the read error is returned.
fn settle(
    child: &mut Child,
    pgid: i32,
    pumped: io::Result<String>,
    grace: Duration,
    program: &str,
) -> Result<(ExitStatus, String)> {
    match pumped {
        Ok(output) => Ok((reap(child, pgid, grace, program)?, output)),
        Err(e) => {
            warn!("reading output of '{}' failed: {}", program, e);
            signal_group(pgid, Signal::SIGKILL);
            if let Err(reap_err) = reap(child, pgid, grace, program) {
                debug!("reap after failed read: {}", reap_err);
            }
            Err(ExecError::Io(e))
        }
    }
}

/// Wait for exit, bounded by `grace`; kills the group if it is exceeded
fn reap(child: &mut Child, pgid: i32, grace: Duration, program: &str) -> Result<ExitStatus> {
    let deadline = Instant::now() + grace;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            warn!(
                "'{}' closed its output but is still running after {:?}, killing it",
                program, grace
            );
            signal_group(pgid, Signal::SIGKILL);
            if let Err(e) = child.wait() {
                debug!("wait after SIGKILL failed: {}", e);
            }
            return Err(ExecError::ReapTimeout {
                program: program.to_string(),
                grace_secs: grace.as_secs(),
            });
        }

        std::thread::sleep(REAP_POLL);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

fn signal_group(pgid: i32, signal: Signal) {
    match killpg(Pid::from_raw(pgid), signal) {
        Ok(()) => info!("sent {:?} to process group {}", signal, pgid),
        // Group is already gone; nothing to terminate
        Err(Errno::ESRCH) => debug!("process group {} already exited", pgid),
        Err(e) => warn!("failed to send {:?} to process group {}: {}", signal, pgid, e),
    }
}

#[derive(Debug, Default)]
struct TimerState {
    finished: bool,
    fired: bool,
}

#[derive(Debug, Default)]
struct KillSwitch {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl KillSwitch {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep until `deadline` unless finished first; returns the guard and
    /// whether the deadline was reached
    fn wait_until<'a>(
        &'a self,
        mut state: MutexGuard<'a, TimerState>,
        deadline: Instant,
    ) -> (MutexGuard<'a, TimerState>, bool) {
        loop {
            if state.finished {
                return (state, false);
            }
            let now = Instant::now();
            if now >= deadline {
                return (state, true);
            }
            state = match self.wake.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Signals are sent while holding the lock, so a cancelled timer can
    /// never fire afterwards.
    fn run(&self, pgid: i32, timeout: Duration, kill_grace: Duration) {
        let start = Instant::now();
        let state = self.lock();

        let (mut state, expired) = self.wait_until(state, start + timeout);
        if !expired {
            return;
        }
        state.fired = true;
        signal_group(pgid, Signal::SIGTERM);

        let (_state, expired) = self.wait_until(state, Instant::now() + kill_grace);
        if expired {
            signal_group(pgid, Signal::SIGKILL);
        }
    }
}

/// Background timer that terminates a process group
struct KillTimer {
    switch: Arc<KillSwitch>,
    handle: JoinHandle<()>,
}

impl KillTimer {
    fn start(pgid: i32, timeout: Duration, kill_grace: Duration) -> Self {
        let switch = Arc::new(KillSwitch::default());
        let remote = Arc::clone(&switch);
        let handle = std::thread::spawn(move || remote.run(pgid, timeout, kill_grace));
        Self { switch, handle }
    }

    /// Disarm the timer; returns whether it had already fired
    fn cancel(self) -> bool {
        let fired = {
            let mut state = self.switch.lock();
            state.finished = true;
            state.fired
        };
        self.switch.wake.notify_all();
        if self.handle.join().is_err() {
            warn!("timeout thread panicked");
        }
        fired
    }
}
