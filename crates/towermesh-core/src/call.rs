//! Call envelope for request/response over a mailbox
//!
//! A [`Call`] pairs the arguments of an operation with a single-use reply
//! slot. The sender pushes the envelope into an actor's mailbox and awaits
//! the [`Pending`] half; the actor answers exactly once through the
//! envelope. Neither side ever touches the other's state.

use tokio::sync::{mpsc, oneshot};

use crate::error::CallError;

/// Arguments plus a single-use reply slot
#[derive(Debug)]
pub struct Call<A, R> {
    args: A,
    reply: oneshot::Sender<R>,
}

/// Reply slot split off from a [`Call`]
#[derive(Debug)]
pub struct Responder<R>(oneshot::Sender<R>);

/// The caller's side of a [`Call`]
#[derive(Debug)]
pub struct Pending<R>(oneshot::Receiver<R>);

impl<A, R> Call<A, R> {
    /// Create an envelope and the future-side handle for its reply
    pub fn new(args: A) -> (Self, Pending<R>) {
        let (reply, rx) = oneshot::channel();
        (Self { args, reply }, Pending(rx))
    }

    /// Borrow the arguments
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Split into arguments and reply slot
    pub fn into_parts(self) -> (A, Responder<R>) {
        (self.args, Responder(self.reply))
    }

    /// Reply without looking at the arguments
    pub fn respond(self, value: R) {
        Responder(self.reply).respond(value);
    }
}

impl<R> Responder<R> {
    /// Send the reply; a caller that stopped waiting is ignored
    pub fn respond(self, value: R) {
        let _ = self.0.send(value);
    }
}

impl<R> Pending<R> {
    /// Wait for the reply
    pub async fn wait(self) -> Result<R, CallError> {
        self.0.await.map_err(|_| CallError::NoReply)
    }
}

/// Send a call into an unbounded mailbox and wait for the reply
///
/// `wrap` places the envelope into the mailbox's message type.
pub async fn call<A, R, M>(
    mailbox: &mpsc::UnboundedSender<M>,
    args: A,
    wrap: impl FnOnce(Call<A, R>) -> M,
) -> Result<R, CallError> {
    let (envelope, pending) = Call::new(args);
    mailbox
        .send(wrap(envelope))
        .map_err(|_| CallError::MailboxClosed)?;
    pending.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Msg {
        Double(Call<u32, u32>),
        Ignore(Call<(), ()>),
    }

    fn spawn_actor() -> mpsc::UnboundedSender<Msg> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Msg::Double(call) => {
                        let (n, responder) = call.into_parts();
                        responder.respond(n * 2);
                    }
                    Msg::Ignore(call) => drop(call),
                }
            }
        });
        tx
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let actor = spawn_actor();
        let result = call(&actor, 21, Msg::Double).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_dropped_envelope_is_no_reply() {
        let actor = spawn_actor();
        let result = call(&actor, (), Msg::Ignore).await;
        assert_eq!(result, Err(CallError::NoReply));
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (tx, rx) = mpsc::unbounded_channel::<Msg>();
        drop(rx);
        let result = call(&tx, 1, Msg::Double).await;
        assert_eq!(result, Err(CallError::MailboxClosed));
    }

    #[tokio::test]
    async fn test_respond_after_caller_gone() {
        let (envelope, pending) = Call::<u8, u8>::new(7);
        drop(pending);
        assert_eq!(*envelope.args(), 7);
        envelope.respond(1);
    }
}
