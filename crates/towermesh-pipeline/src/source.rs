//! Moving values between collections and pipes

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;

use crate::pipe;

/// Send every item of `items` on a new pipe, in order, then close it
pub fn from_iter<I>(items: I) -> Receiver<I::Item>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    I::Item: Send + 'static,
{
    let (tx, rx) = pipe();
    tokio::spawn(async move {
        for item in items {
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Collect everything from `recv` until it closes
///
/// Waits forever if no sender ever closes.
pub async fn gather<T>(mut recv: Receiver<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Some(value) = recv.recv().await {
        values.push(value);
    }
    values
}

/// Group values from `recv` into batches of `count`
///
/// The last batch may be shorter. Empty batches are never sent. A `count`
/// of zero is treated as one.
pub fn gather_n<T: Send + 'static>(mut recv: Receiver<T>, count: usize) -> Receiver<Vec<T>> {
    let count = count.max(1);
    let (tx, rx) = pipe();
    tokio::spawn(async move {
        let mut batch = Vec::with_capacity(count);
        while let Some(value) = recv.recv().await {
            batch.push(value);
            if batch.len() >= count {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(count));
                if tx.send(full).await.is_err() {
                    return;
                }
            }
        }
        if !batch.is_empty() {
            let _ = tx.send(batch).await;
        }
    });
    rx
}

/// Forward everything from `from` into `into`
///
/// `into` is dropped when `from` closes, which closes the target pipe if it
/// was the last sender. Resolves to the number of values moved.
pub fn splice<T: Send + 'static>(mut from: Receiver<T>, into: Sender<T>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut moved = 0;
        while let Some(value) = from.recv().await {
            if into.send(value).await.is_err() {
                break;
            }
            moved += 1;
        }
        moved
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_iter_preserves_order() {
        let values = gather(from_iter(vec!["a", "b", "c"])).await;
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_from_iter_empty_closes() {
        let values: Vec<u8> = gather(from_iter(Vec::new())).await;
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_from_iter_larger_than_pipe() {
        let values = gather(from_iter(0..1000)).await;
        assert_eq!(values.len(), 1000);
        assert_eq!(values[999], 999);
    }

    #[tokio::test]
    async fn test_gather_waits_for_close() {
        let (tx, rx) = pipe();
        let mut gathered = tokio_test::task::spawn(gather(rx));

        tx.send(1).await.unwrap();
        tokio_test::assert_pending!(gathered.poll());

        drop(tx);
        assert!(gathered.is_woken());
        assert_eq!(tokio_test::assert_ready!(gathered.poll()), vec![1]);
    }

    #[tokio::test]
    async fn test_gather_n_batches() {
        let batches = gather(gather_n(from_iter(1..=7), 3)).await;
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[tokio::test]
    async fn test_gather_n_exact_and_empty() {
        let batches = gather(gather_n(from_iter(1..=4), 2)).await;
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4]]);

        let batches: Vec<Vec<u8>> = gather(gather_n(from_iter(Vec::new()), 2)).await;
        assert!(batches.is_empty());

        let batches = gather(gather_n(from_iter(1..=2), 0)).await;
        assert_eq!(batches, vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn test_splice_closes_target() {
        let (tx, rx) = pipe();
        let moved = splice(from_iter(0..5), tx);

        assert_eq!(gather(rx).await, vec![0, 1, 2, 3, 4]);
        assert_eq!(moved.await.unwrap(), 5);
    }
}
