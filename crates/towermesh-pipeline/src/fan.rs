//! Fan-in and fan-out

use tokio::sync::mpsc::Receiver;

use crate::pipe;

/// Merge several pipes into one
///
/// Values from each input keep their relative order; inputs interleave
/// arbitrarily. The output closes once every input has closed.
pub fn multiplex<T: Send + 'static>(inputs: Vec<Receiver<T>>) -> Receiver<T> {
    let (tx, rx) = pipe();
    for mut input in inputs {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(value) = input.recv().await {
                if tx.send(value).await.is_err() {
                    break;
                }
            }
        });
    }
    rx
}

/// Split a pipe in two by `pred`: `(passed, rejected)`
///
/// Both outputs have to be drained concurrently; a full output stalls the
/// split. Dropping one output does not stop the other.
pub fn demultiplex<T, F>(mut recv: Receiver<T>, mut pred: F) -> (Receiver<T>, Receiver<T>)
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    let (pass_tx, pass_rx) = pipe();
    let (reject_tx, reject_rx) = pipe();
    tokio::spawn(async move {
        while let Some(value) = recv.recv().await {
            let target = if pred(&value) { &pass_tx } else { &reject_tx };
            // A dropped output just discards its share
            let _ = target.send(value).await;
            if pass_tx.is_closed() && reject_tx.is_closed() {
                break;
            }
        }
    });
    (pass_rx, reject_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_iter, gather};

    #[tokio::test]
    async fn test_multiplex_merges_everything() {
        let inputs = vec![from_iter(0..50), from_iter(100..150), from_iter(200..250)];
        let mut merged = gather(multiplex(inputs)).await;
        merged.sort();

        let mut expected: Vec<i32> = (0..50).chain(100..150).chain(200..250).collect();
        expected.sort();
        assert_eq!(merged, expected);
    }

    #[tokio::test]
    async fn test_multiplex_keeps_per_input_order() {
        let merged = gather(multiplex(vec![from_iter(0..100), from_iter(1000..1100)])).await;
        let low: Vec<_> = merged.iter().copied().filter(|n| *n < 1000).collect();
        assert_eq!(low, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_multiplex_no_inputs() {
        let merged: Vec<u8> = gather(multiplex(Vec::new())).await;
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_demultiplex() {
        let (even, odd) = demultiplex(from_iter(1..=40), |n| n % 2 == 0);
        let (even, odd) = tokio::join!(gather(even), gather(odd));

        assert_eq!(even, (1..=40).filter(|n| n % 2 == 0).collect::<Vec<_>>());
        assert_eq!(odd, (1..=40).filter(|n| n % 2 == 1).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_demultiplex_one_side_dropped() {
        let (big, small) = demultiplex(from_iter(0..100), |n| *n >= 50);
        drop(small);
        assert_eq!(gather(big).await, (50..100).collect::<Vec<_>>());
    }
}
