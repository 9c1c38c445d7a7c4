//! Tributary Runtime
//!
//! Per-task runtime pieces: the round-robin input channel chooser that
//! multiplexes a task's input channels onto its single reader, and the task
//! manager plugin hooks that attach it to running tasks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chooser;
pub mod plugin;
pub mod schedule;

pub use chooser::{ChannelChoice, ChannelNotifier, ChooserError, InputChannelChooser};
pub use plugin::{PluginError, StreamingPlugin, TaskDescriptor, TaskManagerPlugin};
pub use schedule::RoundRobinSchedule;
