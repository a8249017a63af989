/*!
 * Func Process
 *
 * Runs a synchronous computation inside `invoke`. Both `Err` returns and
 * panics are converted into `ProcessError::Exception`; this is the only
 * place where arbitrary failures enter the completion protocol.
 */

use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::ProcessState;
use crate::process::{Completion, Lifecycle, Process, Start};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

type Body = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Run user code, converting a panic into an `Exception`
pub(crate) fn guarded<T, F>(f: F) -> Result<T, ProcessError>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        ProcessError::msg(format!("panicked: {}", panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Synchronous step
///
/// Kill is a no-op in every state: once started a synchronous step cannot
/// be interrupted, and a Func that was never started is simply never run.
pub struct Func {
    lifecycle: Lifecycle,
    body: Mutex<Option<Body>>,
}

impl Func {
    /// Wrap a fallible computation
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            lifecycle: Lifecycle::new("func"),
            body: Mutex::new(Some(Box::new(f))),
        }
    }

    /// Wrap a computation that only fails by panicking
    pub fn infallible<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || {
            f();
            Ok(())
        })
    }
}

impl Process for Func {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }

        let body = self.body.lock().take();
        let exit = match body {
            Some(body) => guarded(body).and_then(|r| r.map_err(ProcessError::from)),
            None => Ok(()),
        };
        self.lifecycle.finish(exit);
        Ok(())
    }

    fn kill(&self) {}

    fn state(&self) -> ProcessState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.lifecycle.name()
    }
}
