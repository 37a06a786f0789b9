//! Shared ownership of a response with guaranteed single completion.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::response::Response;

type CompleteFn = Box<dyn FnOnce(Response) + Send>;

/// A shared handle to a [`Response`].
///
/// Any number of holders may mutate the enclosed response through
/// [`res`](AsyncResponse::res); when the last `Arc` drops, the completion
/// callback runs exactly once with the finished response. The dispatch
/// pipeline installs a callback that hands the response back to the
/// connection; tests and attachment flows may replace it with
/// [`set_complete`](AsyncResponse::set_complete).
pub struct AsyncResponse {
    res: Mutex<Response>,
    complete: Mutex<Option<CompleteFn>>,
}

impl AsyncResponse {
    pub fn new(complete: impl FnOnce(Response) + Send + 'static) -> Arc<AsyncResponse> {
        Arc::new(AsyncResponse {
            res: Mutex::new(Response::new()),
            complete: Mutex::new(Some(Box::new(complete))),
        })
    }

    /// A handle whose completion is dropped on the floor. Handy in tests
    /// that only inspect intermediate state.
    pub fn detached() -> Arc<AsyncResponse> {
        AsyncResponse::new(|_| {})
    }

    /// Lock the enclosed response for mutation.
    pub fn res(&self) -> MutexGuard<'_, Response> {
        self.res.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the completion callback installed at construction.
    pub fn set_complete(&self, complete: impl FnOnce(Response) + Send + 'static) {
        let mut slot = self.complete.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Box::new(complete));
    }
}

impl Drop for AsyncResponse {
    fn drop(&mut self) {
        let complete = self
            .complete
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(complete) = complete {
            let res = mem::take(self.res.get_mut().unwrap_or_else(|e| e.into_inner()));
            complete(res);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn completes_once_on_last_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = {
            let count = count.clone();
            AsyncResponse::new(move |res| {
                assert_eq!(res.status(), StatusCode::ACCEPTED);
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        seen.res().set_status(StatusCode::ACCEPTED);

        let second = seen.clone();
        drop(seen);
        assert_eq!(count.load(Ordering::SeqCst), 0, "a holder remains");
        drop(second);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replaced_completion_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let resp = {
            let first = first.clone();
            AsyncResponse::new(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            })
        };
        {
            let second = second.clone();
            resp.set_complete(move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(resp);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
