//! Request/response worker pool shared by the per-root engines.
//!
//! Model
//! - A producer thread enumerates root requests into a bounded channel.
//! - `num_workers` workers each own their scratch state and answer requests into
//!   a second bounded channel; only read-only data is shared.
//! - The calling thread collects responses in arrival order. Result buffers
//!   travel with the request and come back with the response, so the collector
//!   can swap a better solution out without copying; the buffer then returns to
//!   the `BufferPool`.
//!
//! A buffer is owned by exactly one of producer, worker, collector or pool at
//! any moment. There is no cancellation: every request is answered.

use std::sync::Mutex;
use std::thread;

use crossbeam_channel::bounded;

use crate::error::PatternError;

/// Stack size for threads running the recursive subdivision engines.
const DEEP_STACK_BYTES: usize = 512 << 20;

/// One worker per hardware thread.
pub fn default_num_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Free list of reusable result buffers.
#[derive(Debug, Default)]
pub struct BufferPool<B> {
    free: Mutex<Vec<B>>,
}

impl<B: Default> BufferPool<B> {
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn take(&self) -> B {
        self.free
            .lock()
            .map(|mut free| free.pop())
            .unwrap_or_default()
            .unwrap_or_default()
    }

    pub fn give_back(&self, buffer: B) {
        if let Ok(mut free) = self.free.lock() {
            free.push(buffer);
        }
    }

    pub fn len(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Answer every request with `work` on `num_workers` threads and feed the
/// responses to `collect` on the calling thread.
///
/// `work` receives the worker's own scratch (built by `make_scratch`) and a
/// result buffer from `pool`; `collect` may swap the buffer's contents out
/// before it returns to the pool. With `num_workers <= 1` everything runs
/// inline on the calling thread.
pub fn run_pool<Req, Resp, B, S>(
    num_workers: usize,
    requests: impl IntoIterator<Item = Req> + Send,
    pool: &BufferPool<B>,
    make_scratch: impl Fn() -> S + Sync,
    work: impl Fn(&mut S, Req, &mut B) -> Resp + Sync,
    mut collect: impl FnMut(Resp, &mut B),
) where
    Req: Send,
    Resp: Send,
    B: Default + Send,
{
    if num_workers <= 1 {
        let mut scratch = make_scratch();
        for request in requests {
            let mut buffer = pool.take();
            let response = work(&mut scratch, request, &mut buffer);
            collect(response, &mut buffer);
            pool.give_back(buffer);
        }
        return;
    }

    let (request_tx, request_rx) = bounded::<(Req, B)>(num_workers);
    let (response_tx, response_rx) = bounded::<(Resp, B)>(num_workers);
    let work = &work;
    let make_scratch = &make_scratch;
    thread::scope(|s| {
        s.spawn(move || {
            for request in requests {
                if request_tx.send((request, pool.take())).is_err() {
                    break;
                }
            }
        });
        for _ in 0..num_workers {
            let request_rx = request_rx.clone();
            let response_tx = response_tx.clone();
            s.spawn(move || {
                let mut scratch = make_scratch();
                for (request, mut buffer) in request_rx {
                    let response = work(&mut scratch, request, &mut buffer);
                    if response_tx.send((response, buffer)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(request_rx);
        drop(response_tx);
        for (response, mut buffer) in response_rx {
            collect(response, &mut buffer);
            pool.give_back(buffer);
        }
    });
}

/// Run `f` on a thread with a stack deep enough for one recursion level per portal.
pub fn with_deep_stack<T: Send>(f: impl FnOnce() -> T + Send) -> Result<T, PatternError> {
    thread::scope(|s| {
        let handle = thread::Builder::new()
            .name("portal-patterns-deep".into())
            .stack_size(DEEP_STACK_BYTES)
            .spawn_scoped(s, f)?;
        match handle.join() {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
