//! # Towermesh Pipeline
//!
//! Small stream combinators over bounded tokio channels.
//!
//! Every combinator takes ownership of an input [`Receiver`], spawns a task
//! that drains it, and hands back the receiving end of a fresh pipe. An output
//! closes once its input has closed and every value has been passed on, so
//! stages compose without any extra shutdown signalling:
//!
//! ```rust,ignore
//! use towermesh_pipeline::{filter, from_iter, gather, map};
//!
//! let evens = filter(from_iter(1..=10), |n| n % 2 == 0);
//! let squares = map(evens, |n| n * n);
//! assert_eq!(gather(squares).await, vec![4, 16, 36, 64, 100]);
//! ```
//!
//! Sequential stages preserve order. The parallel stages ([`pmap`],
//! [`pfilter`]) run each application on the blocking pool and emit results
//! as they finish.
//!
//! A stage stops early when its consumer drops the output.

use tokio::sync::mpsc::{self, Receiver, Sender};

pub mod fan;
pub mod parallel;
pub mod source;
pub mod stage;

pub use fan::{demultiplex, multiplex};
pub use parallel::{pfilter, pmap};
pub use source::{from_iter, gather, gather_n, splice};
pub use stage::{filter, map, reduce};

/// Buffer size of every pipe created by this crate
pub const PIPE_CAPACITY: usize = 16;

/// Create a bounded pipe of [`PIPE_CAPACITY`]
pub fn pipe<T>() -> (Sender<T>, Receiver<T>) {
    mpsc::channel(PIPE_CAPACITY)
}
