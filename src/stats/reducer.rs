//! Long-lived fold tasks for enrichment results.
//!
//! Each reducer is the only writer of its total. It drains its channel until
//! every sender is dropped and then hands the total back through its
//! [`JoinHandle`].

use crate::models::{LineChanges, Views};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of each enrichment result channel.
pub const RESULT_BUFFER: usize = 64;

/// Spawn a task folding every received item into `init`.
pub fn spawn_reducer<T, A, F>(mut rx: mpsc::Receiver<T>, init: A, mut fold: F) -> JoinHandle<A>
where
    T: Send + 'static,
    A: Send + 'static,
    F: FnMut(&mut A, T) + Send + 'static,
{
    tokio::spawn(async move {
        let mut acc = init;
        while let Some(item) = rx.recv().await {
            fold(&mut acc, item);
        }
        acc
    })
}

pub fn spawn_view_reducer(rx: mpsc::Receiver<u64>) -> JoinHandle<Views> {
    spawn_reducer(rx, Views::default(), |views, count| views.count += count)
}

pub fn spawn_line_reducer(rx: mpsc::Receiver<LineChanges>) -> JoinHandle<LineChanges> {
    spawn_reducer(rx, LineChanges::default(), |total, lines| {
        total.additions += lines.additions;
        total.deletions += lines.deletions;
    })
}
