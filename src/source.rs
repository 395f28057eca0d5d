//! The resumable computation contract and adapters for building sources.

use std::convert::Infallible;
use std::iter::Peekable;

/// Indicates whether a delivered result was the last possible one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMode {
    /// The computation is fully consumed; asking for another result is
    /// pointless.
    Final,
    /// Resuming again may produce another result.
    MorePossible,
}

/// Outcome of resuming a [`Source`] once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T, E> {
    /// A result was produced, with a flag for whether more may follow.
    Solution(T, ExitMode),
    /// The computation failed. It will not be resumed again.
    Failed(E),
    /// No result exists. The computation will not be resumed again.
    Exhausted,
}

/// A resumable computation yielding a sequence of results.
///
/// Each call to [`resume`](Source::resume) runs the computation until it
/// produces its next result, fails, or finds that no result exists. A source
/// reporting [`ExitMode::MorePossible`] promises nothing about the next
/// resumption; it may still fail or come up empty. After a result with
/// [`ExitMode::Final`], a failure, or [`Step::Exhausted`], the source is
/// consumed and the caller must not resume it again.
///
/// The worker behind a [`Fluent`](crate::Fluent) owns its source exclusively
/// and drops it the moment it is consumed.
pub trait Source {
    /// The type of one produced result.
    type Item: Send + 'static;
    /// The error type carried to the consumer on failure.
    type Error: Send + 'static;

    /// Attempts to produce the next result.
    fn resume(&mut self) -> Step<Self::Item, Self::Error>;
}

/// Creates a source from a closure returning one [`Step`] per call.
///
/// The closure is invoked once per resumption. It is responsible for
/// honoring the [`Source`] contract: after it reports a final solution, a
/// failure, or exhaustion it is never called again.
pub fn from_fn<T, E, F>(f: F) -> FromFn<F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnMut() -> Step<T, E>,
{
    FromFn { f }
}

/// Source backed by a closure. See [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<T, E, F> Source for FromFn<F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnMut() -> Step<T, E>,
{
    type Item = T;
    type Error = E;

    fn resume(&mut self) -> Step<T, E> {
        (self.f)()
    }
}

/// Creates a source that drains an iterator.
///
/// One item of lookahead is kept so the last item is delivered with
/// [`ExitMode::Final`] rather than forcing an extra resumption to discover
/// the end. The source itself never fails.
pub fn from_iter<I>(items: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator,
{
    FromIter {
        items: items.into_iter().peekable(),
    }
}

/// Source backed by an iterator. See [`from_iter`].
pub struct FromIter<I: Iterator> {
    items: Peekable<I>,
}

impl<I> Source for FromIter<I>
where
    I: Iterator,
    I::Item: Send + 'static,
{
    type Item = I::Item;
    type Error = Infallible;

    fn resume(&mut self) -> Step<Self::Item, Self::Error> {
        let Some(item) = self.items.next() else {
            return Step::Exhausted;
        };
        if self.items.peek().is_some() {
            Step::Solution(item, ExitMode::MorePossible)
        } else {
            Step::Solution(item, ExitMode::Final)
        }
    }
}
