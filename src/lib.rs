//! Pull-based iteration over resumable backtracking computations.
//!
//! A [`Fluent`] converts a computation that yields one result per resumption
//! (anything implementing [`Source`]) into a handle the caller drives one
//! result at a time. The computation runs on a dedicated worker thread that
//! owns it exclusively; handle and worker speak a strict
//! one-request/one-response protocol over a pair of rendezvous channels.
//!
//! The handle starts lazy (nothing runs before the first [`Fluent::get`]),
//! reports after each result whether more may exist, carries the
//! computation's failures back to the caller as values, and tears down
//! deterministically from any point of the iteration.
//!
//! # Example
//!
//! ```
//! use fluents::{ExitMode, Fluent, Step, from_fn};
//!
//! // A "search" producing the squares below 20, one per resumption.
//! let mut n = 0u32;
//! let fluent = Fluent::spawn(from_fn(move || {
//!     n += 1;
//!     if n * n < 20 {
//!         Step::<_, String>::Solution(n * n, ExitMode::MorePossible)
//!     } else {
//!         Step::Exhausted
//!     }
//! }));
//!
//! let squares: Vec<u32> = fluent.map(Result::unwrap).collect();
//! assert_eq!(squares, vec![1, 4, 9, 16]);
//! ```

pub mod fluent;
pub mod source;

mod trace;

pub use fluent::{Fluent, FluentBuilder, FluentError, Solution};
pub use source::{ExitMode, FromFn, FromIter, Source, Step, from_fn, from_iter};
pub use trace::init_tracing;
