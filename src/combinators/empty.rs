/*!
 * Empty Process
 * Completes successfully as soon as it is invoked
 */

use crate::core::errors::ProtocolResult;
use crate::core::types::ProcessState;
use crate::process::{Completion, Lifecycle, Process, Start};

/// Immediate success
///
/// A kill before invoke is honoured like any other variant: the invoke then
/// fails with `Killed`.
pub struct Empty {
    lifecycle: Lifecycle,
}

impl Empty {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new("empty"),
        }
    }
}

impl Default for Empty {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for Empty {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.lifecycle.start(completion)? == Start::Run {
            self.lifecycle.finish(Ok(()));
        }
        Ok(())
    }

    fn kill(&self) {
        self.lifecycle.request_kill();
    }

    fn state(&self) -> ProcessState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.lifecycle.name()
    }
}
