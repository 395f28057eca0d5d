//! Fluent runtime: the handle, its worker thread, and the wire between them.
//!
//! # Architecture
//!
//! Every [`Fluent`] owns one dedicated worker thread and a pair of
//! unidirectional rendezvous channels. The worker owns the source; the two
//! sides exchange nothing but protocol messages:
//!
//! ```text
//! handle (caller's thread)                worker thread
//!      │                                       │
//!      │  Next ─────────────────────────────►  │  resume the source
//!      │  ◄───────────── Solution(value, mode) │
//!      │  ...                                  │
//!      │  Next ─────────────────────────────►  │  resume the source
//!      │  ◄────────────────────────────── End  │
//!      │  Stop ─────────────────────────────►  │  (worker exits)
//!      │        ... join ...                   ▼
//! ```
//!
//! The protocol is strictly alternating: each [`Fluent::get`] sends one
//! request and blocks for exactly one response, and the worker blocks on its
//! request channel whenever it has no pending work. Rendezvous channels make
//! the alternation structural; neither side can run ahead of its peer, and a
//! disconnected channel doubles as a stop signal in both directions.
//!
//! Results move by ownership transfer, so further resumption by the worker
//! cannot alias or mutate values already delivered.
//!
//! # Example
//!
//! ```
//! use fluents::{ExitMode, Fluent, from_iter};
//!
//! let mut fluent = Fluent::spawn(from_iter(["red", "green", "blue"]));
//!
//! let first = fluent.get().unwrap().unwrap();
//! assert_eq!(first.value, "red");
//! assert_eq!(first.exit, ExitMode::MorePossible);
//!
//! // Tear down mid-sequence; the remaining colors are discarded.
//! fluent.destroy();
//! assert!(fluent.get().is_err());
//! ```

mod protocol;
mod worker;

use std::io;
use std::iter::FusedIterator;
use std::panic;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::source::{ExitMode, Source};
use crate::trace::{debug, error, info, trace, warn};

use protocol::{Request, Response};
use worker::Worker;

/// Configuration for the worker thread behind a [`Fluent`].
#[derive(Debug, Clone)]
pub struct FluentBuilder {
    name: String,
    stack_size: Option<usize>,
}

impl FluentBuilder {
    /// Creates a builder with the default worker thread name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "fluent-worker".into(),
            stack_size: None,
        }
    }

    /// Sets the name of the worker thread.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the stack size of the worker thread, in bytes.
    ///
    /// Deeply recursive sources may need more than the platform default.
    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Spawns the worker thread and returns the handle driving it.
    ///
    /// Returns as soon as the thread is running; no part of `source`
    /// executes before the first [`Fluent::get`].
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to spawn the thread.
    pub fn spawn<S>(self, source: S) -> io::Result<Fluent<S::Item, S::Error>>
    where
        S: Source + Send + 'static,
    {
        let (request_tx, request_rx) = bounded(0);
        let (response_tx, response_rx) = bounded(0);

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        debug!(name = %self.name, "spawning worker thread");
        let handle = builder
            .spawn(move || {
                info!("worker thread started");
                let mut worker = Worker::new(source, request_rx, response_tx);
                worker.run();
                info!("worker thread exiting");
            })
            .map_err(|e| {
                error!(name = %self.name, error = %e, "failed to spawn worker thread");
                e
            })?;

        Ok(Fluent {
            link: Some(Link {
                requests: request_tx,
                responses: response_rx,
                worker: handle,
            }),
        })
    }
}

impl Default for FluentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One result delivered by [`Fluent::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution<T> {
    /// The produced value, owned by the caller.
    pub value: T,
    /// Whether requesting another result is meaningful.
    pub exit: ExitMode,
}

/// Error returned by [`Fluent::get`].
#[derive(Debug, thiserror::Error)]
pub enum FluentError<E> {
    /// The source failed while producing a result. Delivered exactly once,
    /// at the `get` that triggered the resumption.
    #[error("computation failed")]
    Computation(E),
    /// The fluent was already destroyed.
    #[error("fluent already destroyed")]
    Destroyed,
    /// The worker thread ended without answering.
    #[error("worker thread terminated unexpectedly")]
    WorkerGone,
}

/// Live connection to a worker: the channel endpoints plus the join handle.
struct Link<T, E> {
    requests: Sender<Request>,
    responses: Receiver<Response<T, E>>,
    worker: JoinHandle<()>,
}

/// Handle to one in-progress, cancelable iteration over a source's results.
///
/// A `Fluent` is either *live* (worker running) or *destroyed* (worker
/// joined, channels released). Every operation on a destroyed fluent fails
/// with [`FluentError::Destroyed`] instead of hanging.
///
/// Dropping a live `Fluent` performs the same teardown as
/// [`Fluent::destroy`], so a worker thread can never outlive its handle.
pub struct Fluent<T, E> {
    link: Option<Link<T, E>>,
}

impl<T, E> Fluent<T, E> {
    /// Spawns a worker for `source` with the default configuration.
    ///
    /// Use [`FluentBuilder`] to control the worker thread's name or stack
    /// size, or to handle spawn failure instead of panicking.
    ///
    /// # Panics
    ///
    /// Panics if thread spawning fails.
    pub fn spawn<S>(source: S) -> Self
    where
        S: Source<Item = T, Error = E> + Send + 'static,
    {
        FluentBuilder::new()
            .spawn(source)
            .expect("failed to spawn worker thread")
    }

    /// Requests the next result, blocking until the worker answers.
    ///
    /// - `Ok(Some(solution))`: a result was produced; [`Solution::exit`]
    ///   tells whether another `get` may find more.
    /// - `Ok(None)`: no (further) result exists. Repeatable, and never
    ///   resumes the source again.
    ///
    /// A panic inside the source is re-raised here, on the calling thread,
    /// exactly once; the fluent is exhausted afterwards and can still be
    /// destroyed.
    ///
    /// Side effects of the source become observable only as a consequence
    /// of a `get` call, never before it and never more than once per
    /// produced result.
    ///
    /// # Errors
    ///
    /// - [`FluentError::Computation`] if the source failed; returned exactly
    ///   once, after which the fluent reports `Ok(None)`.
    /// - [`FluentError::Destroyed`] if [`Fluent::destroy`] has already run.
    /// - [`FluentError::WorkerGone`] if the worker ended without answering.
    pub fn get(&mut self) -> Result<Option<Solution<T>>, FluentError<E>> {
        let Some(link) = self.link.as_ref() else {
            return Err(FluentError::Destroyed);
        };

        trace!("requesting next result");
        if link.requests.send(Request::Next).is_err() {
            warn!("worker gone before the request could be sent");
            return Err(self.reap());
        }

        match link.responses.recv() {
            Ok(Response::Solution(value, exit)) => Ok(Some(Solution { value, exit })),
            Ok(Response::End) => Ok(None),
            Ok(Response::Failed(err)) => Err(FluentError::Computation(err)),
            Ok(Response::Panicked(payload)) => panic::resume_unwind(payload),
            Err(_) => {
                warn!("worker gone without answering");
                Err(self.reap())
            }
        }
    }

    /// Stops the worker, joins it, and releases the channels.
    ///
    /// The worker honors the stop at its next suspension point: before the
    /// first resumption, between results, or after exhaustion. Alternatives
    /// remaining in the source are discarded with it. Safe to call at any
    /// point of the iteration, and again afterwards; a second call is a
    /// no-op.
    pub fn destroy(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        debug!("destroying fluent, stopping worker");
        // A send failure means the worker is already gone; join regardless.
        let _ = link.requests.send(Request::Stop);
        if let Err(payload) = link.worker.join()
            && !thread::panicking()
        {
            panic::resume_unwind(payload);
        }
        debug!("worker joined, channels released");
    }

    /// Returns `true` once [`Fluent::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.link.is_none()
    }

    /// Tears down after the worker vanished mid-protocol.
    ///
    /// Joins the thread so a panic that killed the worker is not lost; the
    /// payload is re-raised on the calling thread.
    fn reap(&mut self) -> FluentError<E> {
        if let Some(link) = self.link.take()
            && let Err(payload) = link.worker.join()
        {
            panic::resume_unwind(payload);
        }
        FluentError::WorkerGone
    }
}

impl<T, E> Iterator for Fluent<T, E> {
    type Item = Result<T, FluentError<E>>;

    /// Pulls the next result. A computation failure is yielded as one `Err`
    /// item; the iteration ends after it. A destroyed fluent iterates as
    /// empty.
    fn next(&mut self) -> Option<Self::Item> {
        match self.get() {
            Ok(Some(solution)) => Some(Ok(solution.value)),
            Ok(None) => None,
            Err(FluentError::Destroyed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<T, E> FusedIterator for Fluent<T, E> {}

impl<T, E> Drop for Fluent<T, E> {
    fn drop(&mut self) {
        self.destroy();
    }
}
