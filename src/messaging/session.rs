//! Timers owned by the open conversation session.
//!
//! Each session runs two tickers: message sync and read confirmation. They
//! only emit tick events; the messenger does the I/O. Dropping or stopping
//! the timers aborts both tasks, so no tick outlives its session.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::MessengerEvent;
use crate::config::Timing;

/// Identifies one open-conversation session. Completions tagged with a stale
/// id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handles to a session's sync and read-confirmation tickers.
pub struct SessionTimers {
    sync_handle: Option<JoinHandle<()>>,
    read_handle: Option<JoinHandle<()>>,
}

impl SessionTimers {
    /// Start both tickers. The first tick of each fires one full period after
    /// start, since opening a conversation already fetches and marks read.
    pub fn start(
        session: SessionId,
        timing: &Timing,
        events: mpsc::UnboundedSender<MessengerEvent>,
    ) -> Self {
        let sync_handle = tokio::spawn(tick_loop(
            timing.poll_interval(),
            events.clone(),
            move || MessengerEvent::SyncTick(session),
        ));
        let read_handle = tokio::spawn(tick_loop(
            timing.read_interval(),
            events,
            move || MessengerEvent::ReadTick(session),
        ));
        tracing::debug!("Session {} timers started", session);
        Self {
            sync_handle: Some(sync_handle),
            read_handle: Some(read_handle),
        }
    }

    /// Stop both tickers.
    pub fn stop(&mut self) {
        if let Some(h) = self.sync_handle.take() {
            h.abort();
        }
        if let Some(h) = self.read_handle.take() {
            h.abort();
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.sync_handle.as_ref().map_or(false, |h| !h.is_finished())
            || self.read_handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop<F>(period: Duration, events: mpsc::UnboundedSender<MessengerEvent>, make: F)
where
    F: Fn() -> MessengerEvent,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // skip first immediate tick

    loop {
        interval.tick().await;
        if events.send(make()).is_err() {
            // Messenger gone.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_cadence_and_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timing = Timing::default();
        let mut timers = SessionTimers::start(SessionId(1), &timing, tx);

        // Nothing fires immediately.
        settle().await;
        assert!(rx.try_recv().is_err());

        let mut syncs = 0;
        let mut reads = 0;
        for _ in 0..10 {
            time::advance(Duration::from_secs(1)).await;
            settle().await;
            while let Ok(ev) = rx.try_recv() {
                match ev {
                    MessengerEvent::SyncTick(SessionId(1)) => syncs += 1,
                    MessengerEvent::ReadTick(SessionId(1)) => reads += 1,
                    _ => panic!("unexpected event"),
                }
            }
        }
        assert_eq!(syncs, 5);
        assert_eq!(reads, 1);

        timers.stop();
        settle().await;
        assert!(!timers.is_running());
        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = SessionTimers::start(SessionId(2), &Timing::default(), tx);
        drop(timers);
        time::advance(Duration::from_secs(20)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }
}
