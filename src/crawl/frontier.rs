//! Bounded frontier of links waiting to be visited
//!
//! Backed by a tokio mpsc channel shared by all workers. A full frontier
//! makes `push` wait, throttling discovery to the pool's drain rate. Closing
//! drops the producing side: pushes fail from then on, including pushes
//! already waiting for room, while links already queued can still be popped
//! until the channel runs dry.

use crate::error::{Error, Result};
use crate::parse::Link;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, Notify};

#[derive(Debug)]
pub struct Frontier {
    sender: Mutex<Option<mpsc::Sender<Link>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Link>>,
    queued: AtomicUsize,
    closed: Notify,
    capacity: usize,
}

impl Frontier {
    /// Create a frontier holding at most `capacity` links (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            queued: AtomicUsize::new(0),
            closed: Notify::new(),
            capacity,
        }
    }

    /// Queue a link, waiting while the frontier is full
    pub async fn push(&self, link: Link) -> Result<()> {
        // Register for the close signal before looking at the sender so a
        // close in between still wakes us
        let closed = self.closed.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::FrontierClosed)?;

        // Count before the link becomes visible so `pop` never decrements first
        let permit = tokio::select! {
            permit = sender.reserve() => permit.map_err(|_| Error::FrontierClosed)?,
            _ = &mut closed => return Err(Error::FrontierClosed),
        };
        self.queued.fetch_add(1, Ordering::SeqCst);
        permit.send(link);
        Ok(())
    }

    /// Take the next link, waiting while the frontier is empty.
    ///
    /// Returns `None` once the frontier is closed and drained.
    pub async fn pop(&self) -> Option<Link> {
        let link = self.receiver.lock().await.recv().await?;
        self.queued.fetch_sub(1, Ordering::SeqCst);
        Some(link)
    }

    /// Stop accepting links. Idempotent.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.closed.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Links queued and not yet popped
    pub fn len(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
