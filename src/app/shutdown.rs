//! Process-wide shutdown token.
//!
//! Cloneable and shareable across threads. Every long-running loop checks
//! it at its head, and every timed wait races it, so the whole system
//! stops within one scheduling round of [`Shutdown::trigger`].

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Poll, Waker};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use futures_lite::future;

use super::ports::Clock;

/// Returned by interruptible waits when shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped;

struct Inner {
    triggered: AtomicBool,
    /// One waker per waiting task; re-polls replace rather than append.
    waiters: Mutex<CriticalSectionRawMutex, RefCell<Vec<Waker>>>,
}

#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                waiters: Mutex::new(RefCell::new(Vec::new())),
            }),
        }
    }

    /// Request shutdown and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        let waiters = self
            .inner
            .waiters
            .lock(|w| core::mem::take(&mut *w.borrow_mut()));
        for waker in waiters {
            waker.wake();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        future::poll_fn(|cx| {
            if self.is_triggered() {
                return Poll::Ready(());
            }
            self.inner.waiters.lock(|w| {
                let mut w = w.borrow_mut();
                if !w.iter().any(|known| known.will_wake(cx.waker())) {
                    w.push(cx.waker().clone());
                }
            });
            // Re-check: trigger() may have drained the list before we registered.
            if self.is_triggered() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await;
    }

    /// Sleep for `duration` unless shutdown arrives first.
    pub async fn sleep<C: Clock>(&self, clock: &C, duration: Duration) -> Result<(), Stopped> {
        if self.is_triggered() {
            return Err(Stopped);
        }
        future::or(
            async {
                clock.sleep(duration).await;
                Ok(())
            },
            async {
                self.wait().await;
                Err(Stopped)
            },
        )
        .await
    }

    /// `Err(Stopped)` once shutdown was requested. For loop heads.
    pub fn check(&self) -> Result<(), Stopped> {
        if self.is_triggered() { Err(Stopped) } else { Ok(()) }
    }
}
