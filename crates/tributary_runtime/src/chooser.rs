//! Input channel chooser for tasks that multiplex several input channels.
//!
//! Readiness callbacks on any thread report channels through a
//! [`ChannelNotifier`]; the task's single reading thread owns the
//! [`InputChannelChooser`] and asks it which channel to read next.
//!
//! Notifications land in a pending queue guarded by a mutex and a condition
//! variable. `choose_next` drains the whole queue into the round-robin
//! schedule before picking, so a burst of notifications between two calls
//! is merged into one pass. A waiting reader re-checks the queue, the
//! blocking flag and the interrupt flag every time it wakes.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use tributary_core::QosConfig;

use crate::schedule::RoundRobinSchedule;

/// Outcome of a successful [`InputChannelChooser::choose_next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelChoice {
    /// Read from this channel next
    Channel(usize),
    /// Nothing is eligible and blocking is switched off
    NoneAvailable,
}

impl ChannelChoice {
    /// The chosen channel, if any
    #[must_use]
    pub const fn channel(self) -> Option<usize> {
        match self {
            Self::Channel(channel) => Some(channel),
            Self::NoneAvailable => None,
        }
    }
}

/// Chooser error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChooserError {
    /// The reader was interrupted while waiting for a channel
    #[error("Interrupted while waiting for an available input channel")]
    Interrupted,
}

#[derive(Debug)]
struct Pending {
    incoming: VecDeque<usize>,
    blocking: bool,
    interrupted: bool,
}

#[derive(Debug)]
struct Shared {
    pending: Mutex<Pending>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        // the queue holds plain indices, nothing to repair after a panic
        self.pending.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Producer side of an [`InputChannelChooser`]
///
/// Cheap to clone and safe to use from any number of threads.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    shared: Arc<Shared>,
}

impl ChannelNotifier {
    /// Report a channel as having data available
    pub fn notify_available(&self, channel: usize) {
        let mut pending = self.shared.lock();
        pending.incoming.push_back(channel);
        self.shared.available.notify_one();
    }

    /// Switch blocking on or off
    ///
    /// Switching it off wakes a waiting reader, which then returns
    /// [`ChannelChoice::NoneAvailable`] if still nothing is eligible.
    pub fn set_blocking(&self, block: bool) {
        let mut pending = self.shared.lock();
        pending.blocking = block;
        tracing::debug!(blocking = block, "input channel chooser blocking changed");
        self.shared.available.notify_all();
    }

    /// Whether the reader blocks when nothing is eligible
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.shared.lock().blocking
    }

    /// Interrupt the reader's current or next wait
    ///
    /// The waiting `choose_next` returns [`ChooserError::Interrupted`]. The
    /// interrupt is consumed by that wait; a call that returns without
    /// waiting, because a channel is eligible or blocking is off, leaves it
    /// pending.
    pub fn interrupt(&self) {
        let mut pending = self.shared.lock();
        pending.interrupted = true;
        self.shared.available.notify_all();
    }
}

/// Decides which input channel a task reads next
#[derive(Debug)]
pub struct InputChannelChooser {
    shared: Arc<Shared>,
    schedule: RoundRobinSchedule,
}

impl InputChannelChooser {
    /// Create a chooser with the given initial blocking flag
    #[must_use]
    pub fn new(block_if_no_channel_available: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending {
                    incoming: VecDeque::new(),
                    blocking: block_if_no_channel_available,
                    interrupted: false,
                }),
                available: Condvar::new(),
            }),
            schedule: RoundRobinSchedule::new(),
        }
    }

    /// Create a chooser with the blocking flag from `config`
    #[must_use]
    pub fn from_config(config: &QosConfig) -> Self {
        Self::new(config.block_if_no_channel_available)
    }

    /// A producer handle for readiness callbacks
    #[must_use]
    pub fn notifier(&self) -> ChannelNotifier {
        ChannelNotifier {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Report a channel as having data available
    pub fn notify_available(&self, channel: usize) {
        self.notifier().notify_available(channel);
    }

    /// Switch blocking on or off, see [`ChannelNotifier::set_blocking`]
    pub fn set_blocking(&self, block: bool) {
        self.notifier().set_blocking(block);
    }

    /// Pick the next channel to read
    ///
    /// Drains pending notifications into the schedule first. If no channel
    /// is eligible and blocking is on, waits until a notification arrives,
    /// blocking is switched off, or the wait is interrupted. There is no
    /// timeout; callers wanting one interrupt the wait themselves.
    ///
    /// # Errors
    ///
    /// Returns [`ChooserError::Interrupted`] if the wait was interrupted.
    pub fn choose_next(&mut self) -> Result<ChannelChoice, ChooserError> {
        let mut pending = self.shared.lock();
        drain(&mut pending, &mut self.schedule);

        if self.schedule.is_empty() {
            loop {
                if !pending.incoming.is_empty() || !pending.blocking {
                    break;
                }
                if pending.interrupted {
                    pending.interrupted = false;
                    tracing::debug!("input channel wait interrupted");
                    return Err(ChooserError::Interrupted);
                }
                tracing::trace!("waiting for an available input channel");
                pending = self
                    .shared
                    .available
                    .wait(pending)
                    .unwrap_or_else(|poison| poison.into_inner());
            }
            drain(&mut pending, &mut self.schedule);
        }
        drop(pending);

        Ok(self
            .schedule
            .next_channel()
            .map_or(ChannelChoice::NoneAvailable, ChannelChoice::Channel))
    }

    /// Remove the channel returned last from the rotation
    ///
    /// It becomes eligible again with its next notification.
    pub fn mark_current_unavailable(&mut self) {
        if let Some(channel) = self.schedule.unschedule_current() {
            tracing::trace!(channel, "input channel unscheduled");
        }
    }

    /// Number of channels currently in the rotation
    #[must_use]
    pub fn eligible_count(&self) -> usize {
        self.schedule.len()
    }
}

fn drain(pending: &mut Pending, schedule: &mut RoundRobinSchedule) {
    while let Some(channel) = pending.incoming.pop_front() {
        schedule.schedule(channel);
    }
}
