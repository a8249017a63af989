/*!
 * Async Bridge
 *
 * Exposes a process as a `Future` resolving to its [`PResult`]. The
 * process is invoked eagerly by [`into_future`]; the future only observes
 * the completion. Dropping the future does not kill the process, use
 * [`ProcessFuture::kill`] for that.
 */

use crate::core::errors::{ProcessError, ProtocolError};
use crate::core::types::{Exit, PResult};
use crate::process::{Completion, Process};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future over a running process
pub struct ProcessFuture {
    process: Arc<dyn Process>,
    outcome: Outcome,
}

enum Outcome {
    Pending(oneshot::Receiver<Exit>),
    Rejected(Option<ProcessError>),
}

/// Invoke `process` and return a future for its result
pub fn into_future<P: Process>(process: P) -> ProcessFuture {
    let process: Arc<dyn Process> = Arc::new(process);
    let (tx, rx) = oneshot::channel();
    let completion = Completion::new(move |exit| {
        let _ = tx.send(exit);
    });

    let outcome = match process.invoke(completion) {
        Ok(()) => Outcome::Pending(rx),
        Err(err) => Outcome::Rejected(Some(err.into())),
    };
    ProcessFuture { process, outcome }
}

impl ProcessFuture {
    /// Forward a kill to the underlying process
    pub fn kill(&self) {
        self.process.kill();
    }

    pub fn process_name(&self) -> &'static str {
        self.process.name()
    }
}

impl Future for ProcessFuture {
    type Output = PResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let name = this.process.name();
        match &mut this.outcome {
            Outcome::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(exit)) => Poll::Ready(PResult::from_exit(exit)),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(PResult::Exception(
                    ProtocolError::CompletionDropped(name).into(),
                )),
                Poll::Pending => Poll::Pending,
            },
            Outcome::Rejected(err) => Poll::Ready(PResult::Exception(
                err.take()
                    .unwrap_or_else(|| ProtocolError::AlreadyInvoked(name).into()),
            )),
        }
    }
}
