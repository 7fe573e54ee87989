//! Process Proxy - run a wrapped package-manager executable transparently
//!
//! The child inherits stdin/stdout/stderr. When it terminates, the parent
//! ends the same way: with the same exit code, or by re-raising the same
//! signal against itself. The forwarding rule is a small state machine
//! driven by child events, so it can be exercised without real processes.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::oneshot;

/// Exit code used until the child reports how it ended
pub const PENDING_EXIT_CODE: i32 = 1;

/// What to spawn; stdio is always inherited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    pub executable: PathBuf,
    pub args: Vec<OsString>,
}

impl ProxySpec {
    pub fn new<I, S>(executable: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lifecycle of the proxied child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Spawning,
    Running { pid: u32 },
    Exited(i32),
    Signaled(i32),
}

/// Events reported by the child process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEvent {
    Spawned { pid: u32 },
    Exited(i32),
    Signaled(i32),
}

/// How the parent process must end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exit(i32),
    Raise(i32),
}

impl ProxyState {
    /// Apply a child event. `Exited` and `Signaled` are final.
    pub fn transition(self, event: ChildEvent) -> ProxyState {
        match (self, event) {
            (ProxyState::Exited(_) | ProxyState::Signaled(_), _) => self,
            (_, ChildEvent::Spawned { pid }) => ProxyState::Running { pid },
            (_, ChildEvent::Exited(code)) => ProxyState::Exited(code),
            (_, ChildEvent::Signaled(signal)) => ProxyState::Signaled(signal),
        }
    }

    /// Termination action for the parent in this state
    pub fn termination(self) -> Termination {
        match self {
            ProxyState::Exited(code) => Termination::Exit(code),
            ProxyState::Signaled(signal) => Termination::Raise(signal),
            ProxyState::Spawning | ProxyState::Running { .. } => {
                Termination::Exit(PENDING_EXIT_CODE)
            }
        }
    }
}

impl ChildEvent {
    /// Translate an OS exit status; a signal wins over a code
    pub fn from_status(status: ExitStatus) -> Option<ChildEvent> {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Some(ChildEvent::Signaled(signal));
            }
        }
        status.code().map(ChildEvent::Exited)
    }
}

impl Termination {
    /// End the current process according to this action
    pub fn apply(self) -> ! {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        match self {
            Termination::Exit(code) => std::process::exit(code),
            Termination::Raise(signal) => {
                raise_signal(signal);
                // Only reached for signals whose default action is not fatal
                std::process::exit(128 + signal)
            }
        }
    }
}

#[cfg(unix)]
fn raise_signal(signal: i32) {
    tracing::debug!("Re-raising signal {} from wrapped child", signal);
    // SAFETY: resetting a disposition and raising a signal have no memory
    // safety preconditions.
    unsafe {
        libc::signal(signal, libc::SIG_DFL);
        libc::raise(signal);
    }
}

#[cfg(not(unix))]
fn raise_signal(_signal: i32) {}

/// A running child the proxy can wait on
pub trait ChildHandle {
    fn id(&self) -> Option<u32>;
    fn wait(&mut self) -> io::Result<ExitStatus>;
}

impl ChildHandle for std::process::Child {
    fn id(&self) -> Option<u32> {
        Some(std::process::Child::id(self))
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        std::process::Child::wait(self)
    }
}

/// Wait for a spawned child and derive the parent's termination
pub fn supervise<C: ChildHandle>(child: &mut C) -> Termination {
    let mut state = ProxyState::Spawning;
    if let Some(pid) = child.id() {
        state = state.transition(ChildEvent::Spawned { pid });
    }
    state = settle(state, child.wait());
    state.termination()
}

fn settle(state: ProxyState, status: io::Result<ExitStatus>) -> ProxyState {
    match status {
        Ok(status) => match ChildEvent::from_status(status) {
            Some(event) => state.transition(event),
            None => state,
        },
        Err(e) => {
            tracing::warn!("Lost track of wrapped process: {}", e);
            state
        }
    }
}

/// Spawn the wrapped executable and block until it terminates
///
/// A relay thread listens for SIGINT, SIGTERM, SIGHUP and SIGQUIT from
/// before the spawn until the child is reaped, and sends each one on to the
/// child. The parent then mirrors whatever the child did with it.
pub fn run_wrapped_sync(spec: &ProxySpec) -> Result<Termination> {
    tracing::debug!("Spawning {:?} with {:?}", spec.executable, spec.args);

    let relay = SignalRelay::start();
    let mut child = std::process::Command::new(&spec.executable)
        .args(&spec.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", spec.executable.display()))?;

    let relay = relay.map(|relay| relay.attach(child.id()));
    let termination = supervise(&mut child);
    if let Some(relay) = relay {
        relay.stop();
    }
    Ok(termination)
}

/// Spawn the wrapped executable and wait for it on the async runtime
///
/// Termination signals delivered to the parent while the child runs are
/// forwarded to the child instead of ending the parent.
pub async fn run_wrapped(spec: &ProxySpec) -> Result<Termination> {
    tracing::debug!("Spawning {:?} with {:?}", spec.executable, spec.args);

    let signals = ForwardedSignals::install()
        .inspect_err(|e| {
            tracing::warn!(
                "Could not install signal handlers, signals will not be forwarded: {}",
                e
            )
        })
        .ok();

    let mut child = tokio::process::Command::new(&spec.executable)
        .args(&spec.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", spec.executable.display()))?;

    let mut state = ProxyState::Spawning;
    if let Some(pid) = child.id() {
        state = state.transition(ChildEvent::Spawned { pid });
    }

    let status = match signals {
        Some(signals) => wait_forwarding_signals(&mut child, signals).await,
        None => child.wait().await,
    };
    Ok(settle(state, status).termination())
}

async fn wait_forwarding_signals(
    child: &mut tokio::process::Child,
    mut signals: ForwardedSignals,
) -> io::Result<ExitStatus> {
    loop {
        let signal = tokio::select! {
            status = child.wait() => return status,
            Some(signal) = signals.recv() => signal,
        };
        if let Some(pid) = child.id() {
            forward_signal(pid, signal);
        }
    }
}

/// Parent-side listeners for the signals relayed to the child
///
/// Listeners are process handlers rather than `SIG_IGN`, so a child spawned
/// after `install` still starts with default dispositions.
#[cfg(unix)]
struct ForwardedSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ForwardedSignals {
    /// Must be called inside a tokio runtime
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> Option<i32> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some(libc::SIGINT),
            Some(()) = self.terminate.recv() => Some(libc::SIGTERM),
            Some(()) = self.hangup.recv() => Some(libc::SIGHUP),
            Some(()) = self.quit.recv() => Some(libc::SIGQUIT),
            else => None,
        }
    }
}

#[cfg(not(unix))]
struct ForwardedSignals;

#[cfg(not(unix))]
impl ForwardedSignals {
    fn install() -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signal forwarding needs a unix platform",
        ))
    }

    async fn recv(&mut self) -> Option<i32> {
        None
    }
}

#[cfg(unix)]
fn forward_signal(pid: u32, signal: i32) {
    tracing::debug!("Forwarding signal {} to {}", signal, pid);
    // SAFETY: kill(2) on a pid we spawned and have not reaped yet.
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

#[cfg(not(unix))]
fn forward_signal(_pid: u32, _signal: i32) {}

/// Background thread relaying signals to a blocking child
///
/// The thread runs its own single-threaded runtime, so the sync proxy works
/// whether or not the caller is already inside one.
struct SignalRelay {
    pid: oneshot::Sender<u32>,
    done: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// A relay whose target pid is known
struct AttachedRelay {
    done: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl SignalRelay {
    /// Start listening; returns once the handlers are installed
    fn start() -> Option<SignalRelay> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (pid_tx, pid_rx) = oneshot::channel::<u32>();
        let (done_tx, mut done_rx) = oneshot::channel::<()>();

        let thread = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let signals = {
                let _enter = runtime.enter();
                ForwardedSignals::install()
            };
            let mut signals = match signals {
                Ok(signals) => {
                    let _ = ready_tx.send(Ok(()));
                    signals
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            runtime.block_on(async move {
                // Signals caught before the pid arrives stay queued
                let Ok(pid) = pid_rx.await else {
                    return;
                };
                loop {
                    tokio::select! {
                        _ = &mut done_rx => return,
                        Some(signal) = signals.recv() => forward_signal(pid, signal),
                    }
                }
            });
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Some(SignalRelay {
                pid: pid_tx,
                done: done_tx,
                thread,
            }),
            Ok(Err(e)) => {
                tracing::warn!(
                    "Could not install signal handlers, signals will not be forwarded: {}",
                    e
                );
                let _ = thread.join();
                None
            }
            Err(_) => {
                tracing::warn!("Signal relay thread exited early, signals will not be forwarded");
                let _ = thread.join();
                None
            }
        }
    }

    /// Point the relay at the spawned child
    fn attach(self, pid: u32) -> AttachedRelay {
        let _ = self.pid.send(pid);
        AttachedRelay {
            done: self.done,
            thread: self.thread,
        }
    }
}

impl AttachedRelay {
    /// Stop relaying; call only after the child has been reaped
    fn stop(self) {
        let _ = self.done.send(());
        if self.thread.join().is_err() {
            tracing::warn!("Signal relay thread panicked");
        }
    }
}
