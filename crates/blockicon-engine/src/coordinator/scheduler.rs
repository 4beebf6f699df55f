use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::watch;

/// Boxed single-threaded future.
pub type LocalFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// Source of animation ticks for primary renderers.
pub trait FrameScheduler {
    /// Resolves when the next frame should be rendered.
    fn next_frame(&self) -> LocalFuture<'_>;

    /// Starts a frame loop on the current thread.
    fn spawn_local(&self, task: LocalFuture<'static>);
}

/// Fixed-interval ticks on the tokio runtime.
///
/// Frame loops are spawned with [`tokio::task::spawn_local`], so renderers
/// must be created from inside a [`tokio::task::LocalSet`].
#[derive(Debug, Copy, Clone)]
pub struct TokioScheduler {
    interval: Duration,
}

impl TokioScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new(super::DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameScheduler for TokioScheduler {
    fn next_frame(&self) -> LocalFuture<'_> {
        Box::pin(tokio::time::sleep(self.interval))
    }

    fn spawn_local(&self, task: LocalFuture<'static>) {
        tokio::task::spawn_local(task);
    }
}

/// One-way cancellation flag shared between a renderer and its frame loop.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Rc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Rc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
