//! Worker loop that owns and drives a source on behalf of a fluent handle.
//!
//! Responsibilities:
//! - Own the source exclusively; the handle's thread never touches it.
//! - Stay idle until the first request arrives (no resumption before that).
//! - Answer every `Next` with exactly one response.
//! - Treat a disconnected handle like an explicit `Stop`.
//! - Release the source as soon as it is consumed, not at thread exit.

use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::{Receiver, Sender};

use crate::source::{ExitMode, Source, Step};
use crate::trace::{debug, trace};

use super::protocol::{Request, Response};

/// Worker state and resumption loop.
pub struct Worker<S: Source> {
    /// The computation. `None` once consumed; further requests answer `End`.
    source: Option<S>,
    requests: Receiver<Request>,
    responses: Sender<Response<S::Item, S::Error>>,
}

impl<S: Source> Worker<S> {
    pub fn new(
        source: S,
        requests: Receiver<Request>,
        responses: Sender<Response<S::Item, S::Error>>,
    ) -> Self {
        Self {
            source: Some(source),
            requests,
            responses,
        }
    }

    /// Runs the request loop.
    ///
    /// Blocks on the request channel between exchanges, so a `Stop` is
    /// honored before the first resumption, between results, and after
    /// exhaustion. Returns when a `Stop` arrives, the handle disconnects,
    /// or a response cannot be delivered.
    pub fn run(&mut self) {
        loop {
            let request = match self.requests.recv() {
                Ok(request) => request,
                // Handle dropped without a stop. Same thing.
                Err(_) => {
                    debug!("request channel disconnected, terminating");
                    return;
                }
            };

            match request {
                Request::Stop => {
                    debug!("stop requested, terminating");
                    return;
                }
                Request::Next => {
                    let response = self.step();
                    if self.responses.send(response).is_err() {
                        debug!("response channel disconnected, terminating");
                        return;
                    }
                }
            }
        }
    }

    /// Resumes the source once and builds the response for one `Next`.
    ///
    /// The source survives only a solution with more alternatives; a final
    /// solution, a failure, exhaustion, or a panic all consume it, and it is
    /// dropped here, before the response is sent.
    fn step(&mut self) -> Response<S::Item, S::Error> {
        let Some(mut source) = self.source.take() else {
            trace!("already exhausted, answering end");
            return Response::End;
        };

        // The source moves into the closure. If `resume` panics it is
        // dropped during unwinding and never observed again.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let step = source.resume();
            (step, source)
        }));

        match outcome {
            Ok((Step::Solution(value, ExitMode::MorePossible), source)) => {
                trace!("solution produced, more possible");
                self.source = Some(source);
                Response::Solution(value, ExitMode::MorePossible)
            }
            Ok((Step::Solution(value, ExitMode::Final), _)) => {
                trace!("final solution produced");
                Response::Solution(value, ExitMode::Final)
            }
            Ok((Step::Failed(err), _)) => {
                debug!("source failed, now exhausted");
                Response::Failed(err)
            }
            Ok((Step::Exhausted, _)) => {
                trace!("source exhausted");
                Response::End
            }
            Err(payload) => {
                debug!("source panicked, forwarding the payload");
                Response::Panicked(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use crossbeam_channel::bounded;

    use crate::source::{from_fn, from_iter};

    use super::*;

    fn spawn_worker<S>(
        source: S,
    ) -> (
        Sender<Request>,
        Receiver<Response<S::Item, S::Error>>,
        thread::JoinHandle<()>,
    )
    where
        S: Source + Send + 'static,
    {
        let (request_tx, request_rx) = bounded(0);
        let (response_tx, response_rx) = bounded(0);
        let handle = thread::spawn(move || {
            let mut worker = Worker::new(source, request_rx, response_tx);
            worker.run();
        });
        (request_tx, response_rx, handle)
    }

    fn silent_panic(payload: String) -> ! {
        panic::resume_unwind(Box::new(payload))
    }

    #[test]
    fn answers_every_next_with_one_response() {
        let (requests, responses, handle) = spawn_worker(from_iter(vec![7, 8]));

        requests.send(Request::Next).unwrap();
        assert!(matches!(
            responses.recv().unwrap(),
            Response::Solution(7, ExitMode::MorePossible)
        ));

        requests.send(Request::Next).unwrap();
        assert!(matches!(
            responses.recv().unwrap(),
            Response::Solution(8, ExitMode::Final)
        ));

        requests.send(Request::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn next_after_exhaustion_keeps_answering_end() {
        let (requests, responses, handle) = spawn_worker(from_iter(std::iter::empty::<u32>()));

        for _ in 0..3 {
            requests.send(Request::Next).unwrap();
            assert!(matches!(responses.recv().unwrap(), Response::End));
        }

        requests.send(Request::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn stop_before_any_next_leaves_the_source_untouched() {
        let resumes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resumes);
        let source = from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Step::<u32, String>::Exhausted
        });

        let (requests, responses, handle) = spawn_worker(source);
        requests.send(Request::Stop).unwrap();
        handle.join().unwrap();

        assert_eq!(resumes.load(Ordering::SeqCst), 0);
        drop(responses);
    }

    #[test]
    fn dropping_the_request_sender_terminates_the_worker() {
        let (requests, responses, handle) = spawn_worker(from_iter(vec![1, 2, 3]));
        drop(requests);
        handle.join().unwrap();
        drop(responses);
    }

    #[test]
    fn panic_in_resume_is_captured_and_exhausts_the_source() {
        let source = from_fn(|| -> Step<u32, String> { silent_panic("boom".into()) });
        let (requests, responses, handle) = spawn_worker(source);

        requests.send(Request::Next).unwrap();
        assert!(matches!(responses.recv().unwrap(), Response::Panicked(_)));

        // The worker stays serviceable afterwards.
        requests.send(Request::Next).unwrap();
        assert!(matches!(responses.recv().unwrap(), Response::End));

        requests.send(Request::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn error_consumes_the_source_without_retry() {
        let resumes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resumes);
        let source = from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Step::<u32, String>::Failed("no route".into())
        });

        let (requests, responses, handle) = spawn_worker(source);

        requests.send(Request::Next).unwrap();
        assert!(matches!(responses.recv().unwrap(), Response::Failed(_)));

        requests.send(Request::Next).unwrap();
        assert!(matches!(responses.recv().unwrap(), Response::End));
        assert_eq!(resumes.load(Ordering::SeqCst), 1);

        requests.send(Request::Stop).unwrap();
        handle.join().unwrap();
    }
}
