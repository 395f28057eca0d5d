//! Message types exchanged between a fluent handle and its worker.
//!
//! These are internal messages passed over a per-fluent pair of rendezvous
//! channels. They are NOT part of the public API.
//!
//! Message flows:
//! - Handle → Worker: `Next` to request a result, `Stop` to terminate
//! - Worker → Handle: exactly one response per `Next`; `Stop` is never
//!   answered, the worker exits instead

use std::any::Any;

use crate::source::ExitMode;

/// Requests sent from the handle to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Resume the computation and answer with the next result.
    Next,
    /// Terminate without resuming the computation further.
    Stop,
}

/// Responses sent from the worker to the handle.
pub enum Response<T, E> {
    /// A result, with a flag for whether another may follow.
    Solution(T, ExitMode),
    /// The computation failed while producing. Terminal: every later `Next`
    /// is answered with `End`.
    Failed(E),
    /// The computation panicked. Carries the payload so the handle can
    /// re-raise it on the requesting thread. Terminal, like `Failed`.
    Panicked(Box<dyn Any + Send>),
    /// No (further) result exists.
    End,
}
