//! The cooperative event loop around a [`SyncController`].
//!
//! A session owns the controller and its snapshot subscription. Each
//! [`Session::tick`] waits for whichever comes first, the next snapshot event
//! or the pending debounce deadline, and applies it. Everything runs on the
//! task that drives the session; nothing is spawned.
//!
//! Callers that race the session against other futures use
//! [`Session::wait`], which is cancel-safe, and then [`Session::handle`]
//! outside the race.

use std::future::pending;

use tokio::time::{sleep_until, Instant};

use crate::cache::CacheSlot;
use crate::controller::SyncController;
use crate::error::Result;
use crate::models::NoteId;
use crate::store::{NoteStore, SnapshotEvent, Subscription};

/// Why [`Session::wait`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    /// The subscription yielded; `None` means the stream closed
    Event(Option<SnapshotEvent>),
    /// The debounce deadline passed
    Deadline,
    /// Nothing to wait for
    Idle,
}

/// What a single [`Session::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// A snapshot replaced the note list
    Reconciled { count: usize },
    /// A debounced edit was written to this note
    Flushed { note_id: NoteId },
    /// The debounce timer fired but there was nothing to write
    FlushSkipped,
    /// The snapshot stream reported an error; last-known-good state kept
    StreamError(String),
    /// The store closed the snapshot stream
    StreamClosed,
    /// Nothing to wait for
    Idle,
}

pub struct Session<C, S> {
    controller: SyncController<C, S>,
    subscription: Option<Subscription>,
}

impl<C: CacheSlot, S: NoteStore> Session<C, S> {
    /// Start a session, acquiring the snapshot subscription when the
    /// controller has a store.
    ///
    /// A failed subscribe leaves the session running on cached state in
    /// degraded mode.
    pub async fn start(mut controller: SyncController<C, S>) -> Self {
        let subscription = match controller.store() {
            Some(store) => match store.subscribe().await {
                Ok(subscription) => Some(subscription),
                Err(error) => {
                    controller.mark_stream_error(error.to_string());
                    None
                }
            },
            None => None,
        };

        Self {
            controller,
            subscription,
        }
    }

    pub const fn controller(&self) -> &SyncController<C, S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SyncController<C, S> {
        &mut self.controller
    }

    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for and handle the next event.
    ///
    /// Flush failures are returned; the buffer keeps the unsent text and
    /// the debounce timer is restarted. Not cancel-safe: dropping it while a
    /// snapshot or flush is being applied can leave the cache behind the
    /// in-memory list. Race [`Session::wait`] instead.
    pub async fn tick(&mut self) -> Result<Tick> {
        let wake = self.wait().await;
        self.handle(wake).await
    }

    /// Wait for the next snapshot event or the debounce deadline without
    /// acting on it. Cancel-safe.
    pub async fn wait(&mut self) -> Wake {
        let deadline = self.controller.flush_deadline();
        if deadline.is_none() && self.subscription.is_none() {
            return Wake::Idle;
        }

        tokio::select! {
            event = next_event(self.subscription.as_mut()) => Wake::Event(event),
            () = sleep_until_deadline(deadline) => Wake::Deadline,
        }
    }

    /// Apply what [`Session::wait`] returned
    pub async fn handle(&mut self, wake: Wake) -> Result<Tick> {
        match wake {
            Wake::Event(event) => Ok(self.handle_event(event).await),
            Wake::Deadline => self.handle_deadline().await,
            Wake::Idle => Ok(Tick::Idle),
        }
    }

    /// Apply snapshot events that have already arrived, without waiting
    pub async fn drain(&mut self) -> Vec<Tick> {
        let mut ticks = Vec::new();
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) {
            ticks.push(self.handle_event(Some(event)).await);
        }
        ticks
    }

    /// Flush any unsent edit and release the subscription.
    ///
    /// The subscription is released even when the flush fails.
    pub async fn close(mut self) -> Result<SyncController<C, S>> {
        let flushed = self.controller.flush_pending().await;
        self.subscription.take();
        tracing::debug!("Session closed");
        flushed.map(|_| self.controller)
    }

    async fn handle_event(&mut self, event: Option<SnapshotEvent>) -> Tick {
        match event {
            Some(SnapshotEvent::Snapshot(notes)) => {
                let count = notes.len();
                self.controller.reconcile_snapshot(notes).await;
                Tick::Reconciled { count }
            }
            Some(SnapshotEvent::Error(message)) => {
                self.controller.mark_stream_error(message.clone());
                Tick::StreamError(message)
            }
            None => {
                self.subscription = None;
                self.controller.mark_stream_error("snapshot stream closed");
                Tick::StreamClosed
            }
        }
    }

    async fn handle_deadline(&mut self) -> Result<Tick> {
        let note_id = self.controller.current_note_id().cloned();
        if self.controller.flush_due(Instant::now()).await? {
            Ok(note_id.map_or(Tick::FlushSkipped, |note_id| Tick::Flushed { note_id }))
        } else {
            Ok(Tick::FlushSkipped)
        }
    }
}

async fn next_event(subscription: Option<&mut Subscription>) -> Option<SnapshotEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
