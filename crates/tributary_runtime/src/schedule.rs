//! Round-robin schedule over eligible input channels.

use indexmap::IndexSet;

/// Cyclic order over the channels currently eligible for reading
///
/// Channels join at the end of the ring in the order they are scheduled.
/// `next_channel` serves the ring one position at a time and wraps around.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinSchedule {
    channels: IndexSet<usize>,
    /// Ring position served next, may equal `channels.len()` before wrapping
    next: usize,
    /// Ring position of the channel returned last
    current: Option<usize>,
}

impl RoundRobinSchedule {
    /// Create an empty schedule
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a channel eligible
    ///
    /// Returns `false` if it already was; its ring position is kept.
    pub fn schedule(&mut self, channel: usize) -> bool {
        self.channels.insert(channel)
    }

    /// Return the next eligible channel and advance the cursor
    pub fn next_channel(&mut self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }
        let position = if self.next >= self.channels.len() { 0 } else { self.next };
        self.current = Some(position);
        self.next = position + 1;
        self.channels.get_index(position).copied()
    }

    /// Remove the channel returned last from the ring
    ///
    /// All other channels keep their relative order and the cursor moves to
    /// the channel that followed the removed one. Returns the removed
    /// channel, or `None` if nothing was returned since the last removal.
    pub fn unschedule_current(&mut self) -> Option<usize> {
        let position = self.current.take()?;
        let channel = self.channels.shift_remove_index(position)?;
        if self.next > position {
            self.next -= 1;
        }
        Some(channel)
    }

    /// Whether a channel is eligible
    #[must_use]
    pub fn contains(&self, channel: usize) -> bool {
        self.channels.contains(&channel)
    }

    /// Number of eligible channels
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is eligible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
