//! Periodic dispatch on tokio: run a command on a schedule, or stream fire
//! notifications over a channel.
//!
//! Both loops only observe cancellation while suspended, never in the middle
//! of computing the next fire time.

use std::sync::Arc;
use std::time::Duration;

use jiff::Zoned;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ast::Schedule;
use crate::error::ScheduleError;
use crate::eval::Next;
use crate::lexer;

/// A command line bound to a schedule.
///
/// A job is consumed by [`run`](Job::run), so a run-once job fires at most
/// once. It is not `Clone`:
///
/// ```compile_fail
/// use xcron::Schedule;
///
/// let job = Schedule::parse("@reboot").unwrap().bind("true").unwrap();
/// let again: xcron::Job = job.clone();
/// ```
#[derive(Debug)]
pub struct Job {
    schedule: Arc<Schedule>,
    program: String,
    args: Vec<String>,
}

impl Job {
    /// Split `command` on whitespace into program and arguments. No shell
    /// quoting is applied.
    pub fn new(schedule: Arc<Schedule>, command: &str) -> Result<Self, ScheduleError> {
        let mut words = lexer::tokenize(command)
            .into_iter()
            .map(|token| token.text.to_string());
        let program = words
            .next()
            .ok_or_else(|| ScheduleError::command(command))?;
        Ok(Self {
            schedule,
            program,
            args: words.collect(),
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Fire the command every time the schedule comes due, until `shutdown`
    /// is cancelled or the schedule has no further fire times.
    ///
    /// A run-once schedule fires immediately and returns when the command exits
    /// or `shutdown` is cancelled, whichever comes first; cancelling kills the
    /// command. Otherwise fired commands are detached: a slow command never
    /// delays the next fire.
    pub async fn run(self, shutdown: CancellationToken) {
        if self.schedule.is_once() {
            tracing::info!(command = %self.program, "running once");
            tokio::select! {
                _ = execute(&self.program, &self.args) => {}
                _ = shutdown.cancelled() => {
                    tracing::debug!(command = %self.program, "job cancelled");
                }
            }
            return;
        }

        let mut next = self.schedule.next(Some(&Zoned::now()));
        loop {
            let Some(at) = next.time.take() else {
                tracing::debug!(command = %self.program, state = %next.state, "schedule finished");
                return;
            };

            let delay = delay_until(&Zoned::now(), &at);
            tracing::debug!(
                command = %self.program,
                next = %at,
                delay_ms = delay.as_millis() as u64,
                "timer armed"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    tracing::debug!(command = %self.program, "job cancelled");
                    return;
                }
            }

            // A wake-up slightly before `at` must not yield `at` again.
            let now = Zoned::now();
            next = self.schedule.next(Some(if now < at { &at } else { &now }));
            if !next.is_found() {
                tracing::debug!(command = %self.program, state = %next.state, "schedule finished");
                return;
            }

            tracing::info!(command = %self.program, at = %at, "job fired");
            drop(self.fire());
        }
    }

    /// Same as [`run`](Self::run), but on a spawned task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Launch the command on its own task.
    fn fire(&self) -> JoinHandle<()> {
        let program = self.program.clone();
        let args = self.args.clone();
        tokio::spawn(async move { execute(&program, &args).await })
    }
}

/// Run the command to completion. Failures are logged, never returned.
///
/// Dropping the future kills the child.
async fn execute(program: &str, args: &[String]) {
    let status = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {
            tracing::debug!(command = %program, "command finished");
        }
        Ok(status) => {
            tracing::error!(command = %program, %status, "command exited with failure");
        }
        Err(e) => {
            tracing::error!(command = %program, error = %e, "failed to spawn command");
        }
    }
}

/// Stream one [`Next`] per fire time, each sent when its time arrives.
///
/// A final non-found notification (`OnceExec`, `NoMatches`) is sent before the
/// channel closes. Cancelling `shutdown` or dropping the receiver closes it
/// silently.
pub fn watch(schedule: Arc<Schedule>, shutdown: CancellationToken) -> mpsc::Receiver<Next> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut reference = Zoned::now();
        loop {
            let next = schedule.next(Some(&reference));
            let Some(at) = next.time.clone() else {
                tracing::debug!(state = %next.state, "watch finished");
                let _ = tx.send(next).await;
                return;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay_until(&Zoned::now(), &at)) => {}
                _ = shutdown.cancelled() => {
                    tracing::debug!("watch cancelled");
                    return;
                }
                _ = tx.closed() => return,
            }

            tokio::select! {
                sent = tx.send(next) => {
                    if sent.is_err() {
                        return;
                    }
                }
                _ = shutdown.cancelled() => return,
            }
            reference = at;
        }
    });

    rx
}

fn delay_until(now: &Zoned, at: &Zoned) -> Duration {
    Duration::try_from(now.duration_until(at)).unwrap_or(Duration::ZERO)
}
