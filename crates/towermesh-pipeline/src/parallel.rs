//! Parallel stages
//!
//! Each application runs on tokio's blocking pool, with at most `workers`
//! in flight. Results are emitted as they complete, so order is not
//! preserved. Only worth it when the function is heavy.

use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::{JoinError, JoinSet};
use tracing::warn;

use crate::pipe;

/// Apply `f` to each value in parallel
pub fn pmap<T, U, F>(recv: Receiver<T>, workers: usize, f: F) -> Receiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    run_workers(recv, workers, move |value| Some(f(value)))
}

/// Keep the values for which `keep` returns true, testing in parallel
pub fn pfilter<T, F>(recv: Receiver<T>, workers: usize, keep: F) -> Receiver<T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    run_workers(recv, workers, move |value| keep(&value).then_some(value))
}

fn run_workers<T, U, F>(mut recv: Receiver<T>, workers: usize, job: F) -> Receiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Option<U> + Send + Sync + 'static,
{
    let workers = workers.max(1);
    let job = Arc::new(job);
    let (tx, rx) = pipe();

    tokio::spawn(async move {
        let mut running: JoinSet<Option<U>> = JoinSet::new();
        let mut input_open = true;

        while input_open || !running.is_empty() {
            tokio::select! {
                Some(done) = running.join_next(), if !running.is_empty() => {
                    if !forward(done, &tx).await {
                        return;
                    }
                }
                value = recv.recv(), if input_open && running.len() < workers => match value {
                    Some(value) => {
                        let job = Arc::clone(&job);
                        running.spawn_blocking(move || job(value));
                    }
                    None => input_open = false,
                },
            }
        }
    });
    rx
}

/// Pass a finished result on; false once the consumer is gone
async fn forward<U>(done: Result<Option<U>, JoinError>, tx: &Sender<U>) -> bool {
    match done {
        Ok(Some(value)) => tx.send(value).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            warn!(error = %e, "Pipeline worker failed");
            true
        }
    }
}
