/*!
 * Trampoline
 *
 * Lets Sequence and While run children that complete synchronously inside
 * `invoke` without recursing once per step. The driver marks itself as
 * `Driving` around each child invoke; a completion arriving while the
 * driver is still on the stack only records `Bounced` and returns, and the
 * driver loops. A completion arriving later (another thread, a timer)
 * finds `Idle` and drives the next step itself.
 */

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bounce {
    Idle,
    Driving,
    Bounced,
}

pub(crate) struct Trampoline {
    state: Mutex<Bounce>,
}

impl Trampoline {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(Bounce::Idle),
        }
    }

    /// Mark the driver as being on the stack around a child invoke
    #[inline]
    pub(crate) fn enter(&self) {
        *self.state.lock() = Bounce::Driving;
    }

    /// Called from a child completion
    ///
    /// Returns `true` if the driver is still on the stack and will continue;
    /// `false` means the caller must drive the next step itself.
    #[inline]
    pub(crate) fn bounce(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            Bounce::Driving => {
                *state = Bounce::Bounced;
                true
            }
            Bounce::Idle | Bounce::Bounced => false,
        }
    }

    /// Called by the driver once the child invoke returned
    ///
    /// Returns `true` if the child already completed and the driver should
    /// loop; otherwise the driver leaves and the completion will drive.
    #[inline]
    pub(crate) fn settle(&self) -> bool {
        let mut state = self.state.lock();
        let bounced = *state == Bounce::Bounced;
        *state = Bounce::Idle;
        bounced
    }
}
