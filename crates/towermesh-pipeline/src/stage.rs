//! Sequential, order-preserving stages

use tokio::sync::mpsc::Receiver;

use crate::pipe;

/// Apply `f` to each value
pub fn map<T, U, F>(mut recv: Receiver<T>, mut f: F) -> Receiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    let (tx, rx) = pipe();
    tokio::spawn(async move {
        while let Some(value) = recv.recv().await {
            if tx.send(f(value)).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Pass on only the values for which `keep` returns true
pub fn filter<T, F>(mut recv: Receiver<T>, mut keep: F) -> Receiver<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    let (tx, rx) = pipe();
    tokio::spawn(async move {
        while let Some(value) = recv.recv().await {
            if keep(&value) && tx.send(value).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Fold every value into the first one with `f`
///
/// `None` if `recv` closes without yielding anything. The first value is
/// taken as is.
pub async fn reduce<T, F>(mut recv: Receiver<T>, mut f: F) -> Option<T>
where
    F: FnMut(T, T) -> T,
{
    let mut acc = recv.recv().await?;
    while let Some(value) = recv.recv().await {
        acc = f(acc, value);
    }
    Some(acc)
}
