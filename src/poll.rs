//! Polling engine: bounded sleep-and-recheck in place of a blocking wait
//!
//! Every wait point in the protocol goes through [`wait_until`]: the server
//! awaiting PENDING (unbounded), a client awaiting FREE before sending
//! (bounded by attempts), and a client awaiting READY after sending
//! (bounded by wall-clock duration). A read failure inside an iteration is
//! transient and retries under the same budget. The cancellation token is
//! checked at every polling boundary, so shutdown latency never exceeds one
//! poll interval.

use crate::cancel::CancelToken;
use crate::slot::{Message, SlotFile};
use std::time::{Duration, Instant};

/// How long a wait is allowed to go unsatisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBudget {
    /// Poll forever; only cancellation ends the wait
    Unbounded,
    /// Give up after this many unsatisfied poll iterations
    Attempts(u32),
    /// Give up once this much wall-clock time has elapsed
    Duration(Duration),
}

/// Result of a wait
#[derive(Debug)]
pub enum WaitOutcome {
    /// The predicate held; carries the observed record
    Satisfied(Message),
    /// The budget ran out before the predicate held
    TimedOut,
    /// The cancellation token tripped
    Cancelled,
}

/// Poll the slot until `predicate` holds for the record read from it.
pub fn wait_until<P>(
    slot: &mut SlotFile,
    mut predicate: P,
    interval: Duration,
    budget: PollBudget,
    cancel: &CancelToken,
) -> WaitOutcome
where
    P: FnMut(&Message) -> bool,
{
    let deadline = match budget {
        PollBudget::Duration(limit) => Some(Instant::now() + limit),
        _ => None,
    };
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        // A failed read is transient; it spends budget like any other
        // unsatisfied iteration.
        if let Ok(msg) = slot.read() {
            if predicate(&msg) {
                return WaitOutcome::Satisfied(msg);
            }
        }

        match budget {
            PollBudget::Unbounded => {}
            PollBudget::Attempts(max) => {
                attempts += 1;
                if attempts >= max {
                    return WaitOutcome::TimedOut;
                }
            }
            PollBudget::Duration(_) => {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        std::thread::sleep(interval);
    }
}
