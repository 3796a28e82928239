//! One-shot completion plumbing between a play and whoever awaits it.
//!
//! The [`Completer`] lives inside the play and may be resolved from any thread
//! (engine completion runs wherever the engine signals it). The awaiting side is
//! a plain future: its continuation runs on whichever executor polls it, which is
//! the context that issued `play`. Waking crosses threads; the continuation
//! does not.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// Resolves when its play completes. Dropping the play without an explicit
/// resolve also resolves it, so an awaiter is never left pending.
#[derive(Debug)]
#[must_use = "a PlayCompletion does nothing unless awaited; drop it for fire-and-forget"]
pub struct PlayCompletion {
    rx: Option<oneshot::Receiver<()>>,
}

impl PlayCompletion {
    /// A completion that is already resolved (superseded request, unsupported
    /// environment).
    pub fn resolved() -> Self {
        Self { rx: None }
    }

    /// Non-blocking check. Once true, stays true.
    pub fn is_resolved(&mut self) -> bool {
        match self.rx.as_mut() {
            None => true,
            Some(rx) => match rx.try_recv() {
                Ok(None) => false,
                Ok(Some(())) | Err(oneshot::Canceled) => {
                    self.rx = None;
                    true
                }
            },
        }
    }
}

impl Future for PlayCompletion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(());
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(_) => {
                self.rx = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Sending half held by a play.
#[derive(Debug)]
pub(crate) struct Completer {
    tx: Option<oneshot::Sender<()>>,
}

impl Completer {
    /// Resolve the awaiter. Later calls are no-ops.
    pub(crate) fn resolve(&mut self) {
        if let Some(tx) = self.tx.take() {
            // The awaiter may have been dropped (fire-and-forget).
            let _ = tx.send(());
        }
    }
}

pub(crate) fn channel() -> (Completer, PlayCompletion) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx: Some(tx) }, PlayCompletion { rx: Some(rx) })
}
