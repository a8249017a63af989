/*!
 * Blocking Bridge
 *
 * Drives a process to completion from synchronous code. The completion
 * sends the exit over a one-slot flume channel; the calling thread parks
 * on the receiver unless the process already completed during `invoke`.
 *
 * Each run opens a [`RunSpan`] so every lifecycle event of the tree is
 * correlated under one trace ID.
 */

use crate::core::errors::{ProcessError, ProtocolError};
use crate::core::limits::KILL_GRACE_PERIOD;
use crate::core::types::{Exit, PResult};
use crate::monitoring::RunSpan;
use crate::process::{Completion, Process};
use flume::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;
use tracing::{debug, warn};

fn exit_channel() -> (Completion, Receiver<Exit>) {
    let (tx, rx) = flume::bounded(1);
    let completion = Completion::new(move |exit| {
        // Receiver gone means the caller stopped waiting
        let _ = tx.send(exit);
    });
    (completion, rx)
}

fn start<P>(process: &P, span: &RunSpan) -> Result<Receiver<Exit>, ProcessError>
where
    P: Process + ?Sized,
{
    let (completion, rx) = exit_channel();
    let _entered = span.enter();
    process.invoke(completion)?;
    Ok(rx)
}

/// Run `process` and block until it completes, returning the tagged result
pub fn run_blocking<P>(process: &P) -> PResult
where
    P: Process + ?Sized,
{
    let span = RunSpan::new(process.name());
    let result = match start(process, &span) {
        Ok(rx) => {
            let exit = match rx.try_recv() {
                Ok(exit) => Ok(exit),
                Err(TryRecvError::Empty) => rx.recv().map_err(|_| ()),
                Err(TryRecvError::Disconnected) => Err(()),
            };
            match exit {
                Ok(exit) => PResult::from_exit(exit),
                Err(()) => dropped(process.name()),
            }
        }
        Err(err) => PResult::Exception(err),
    };
    span.record_result(&result);
    result
}

/// Run `process` and block until it completes
///
/// Returns normally for Done and raises the captured error for Killed or
/// Exception.
pub fn invoke_blocking<P>(process: &P) -> Exit
where
    P: Process + ?Sized,
{
    run_blocking(process).into_result()
}

/// Run `process`, killing it if it has not completed within `timeout`
///
/// After the kill the caller waits up to [`KILL_GRACE_PERIOD`] for the
/// process to report its exit. A process that still has not reported is
/// abandoned and the call fails with `Killed`.
pub fn invoke_blocking_timeout<P>(process: &P, timeout: Duration) -> Exit
where
    P: Process + ?Sized,
{
    let span = RunSpan::new(process.name());
    let rx = match start(process, &span) {
        Ok(rx) => rx,
        Err(err) => {
            let result = PResult::Exception(err);
            span.record_result(&result);
            return result.into_result();
        }
    };

    let result = match rx.recv_timeout(timeout) {
        Ok(exit) => PResult::from_exit(exit),
        Err(RecvTimeoutError::Disconnected) => dropped(process.name()),
        Err(RecvTimeoutError::Timeout) => {
            let _entered = span.enter();
            debug!(process = process.name(), ?timeout, "deadline passed, killing");
            process.kill();

            match rx.recv_timeout(KILL_GRACE_PERIOD) {
                Ok(exit) => PResult::from_exit(exit),
                Err(RecvTimeoutError::Disconnected) => dropped(process.name()),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        process = process.name(),
                        grace = ?KILL_GRACE_PERIOD,
                        "process ignored kill, abandoning"
                    );
                    PResult::Killed
                }
            }
        }
    };
    span.record_result(&result);
    result.into_result()
}

fn dropped(name: &'static str) -> PResult {
    warn!(process = name, "completion dropped without signalling");
    PResult::Exception(ProtocolError::CompletionDropped(name).into())
}
