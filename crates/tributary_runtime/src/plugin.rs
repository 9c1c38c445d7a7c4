//! Task manager plugin lifecycle.
//!
//! The surrounding runtime calls a [`TaskManagerPlugin`] when a task starts,
//! when it finishes, is cancelled or fails, and once before the task manager
//! shuts down. [`StreamingPlugin`] uses these hooks to hand every task its
//! input channel chooser and to unblock a task's reader when it goes away.

use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use tributary_core::{CoreError, QosConfig, TaskId, VertexId};

use crate::chooser::{ChannelNotifier, InputChannelChooser};

/// Plugin error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Task registered twice
    #[error("Task already registered: {0}")]
    AlreadyRegistered(TaskId),

    /// Task not registered
    #[error("Task not registered: {0}")]
    NotRegistered(TaskId),

    /// Job configuration rejected
    #[error("Invalid job configuration: {0}")]
    InvalidConfiguration(#[from] CoreError),

    /// Shutdown was already signalled
    #[error("Plugin shutting down")]
    ShuttingDown,
}

/// What the runtime tells a plugin about a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// Task identity
    pub task_id: TaskId,
    /// The vertex instance the task executes
    pub vertex_id: VertexId,
    /// Human readable task name
    pub name: String,
}

impl TaskDescriptor {
    /// Create a new descriptor
    #[must_use]
    pub fn new(task_id: TaskId, vertex_id: VertexId, name: impl Into<String>) -> Self {
        Self {
            task_id,
            vertex_id,
            name: name.into(),
        }
    }
}

/// Hooks through which the task manager attaches per-task state
pub trait TaskManagerPlugin: Send + Sync {
    /// Register a newly started task
    ///
    /// `plugin_data` is opaque payload attached by the job manager side.
    ///
    /// # Errors
    ///
    /// Returns error if the task cannot be attached
    fn register_task(
        &self,
        task: &TaskDescriptor,
        job_config: &QosConfig,
        plugin_data: &[u8],
    ) -> Result<(), PluginError>;

    /// Unregister a finished, cancelled or failed task
    ///
    /// # Errors
    ///
    /// Returns error if the task was never registered
    fn unregister_task(&self, task_id: TaskId) -> Result<(), PluginError>;

    /// The task manager is about to shut down
    fn shutdown(&self);
}

#[derive(Debug)]
struct RegisteredTask {
    descriptor: TaskDescriptor,
    config: QosConfig,
    plugin_data: Vec<u8>,
    notifier: ChannelNotifier,
    chooser: Option<InputChannelChooser>,
}

#[derive(Debug, Default)]
struct Registry {
    tasks: IndexMap<TaskId, RegisteredTask>,
    shut_down: bool,
}

/// Plugin that equips every registered task with an input channel chooser
#[derive(Debug, Default)]
pub struct StreamingPlugin {
    registry: Mutex<Registry>,
}

impl StreamingPlugin {
    /// Create a plugin with no registered tasks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Hand out the task's chooser to its reading thread
    ///
    /// Returns `None` for unknown tasks and on every call after the first.
    pub fn take_chooser(&self, task_id: TaskId) -> Option<InputChannelChooser> {
        self.lock().tasks.get_mut(&task_id)?.chooser.take()
    }

    /// Producer handle for the task's channel readiness callbacks
    #[must_use]
    pub fn notifier(&self, task_id: TaskId) -> Option<ChannelNotifier> {
        self.lock().tasks.get(&task_id).map(|t| t.notifier.clone())
    }

    /// Job configuration the task was registered with
    #[must_use]
    pub fn config(&self, task_id: TaskId) -> Option<QosConfig> {
        self.lock().tasks.get(&task_id).map(|t| t.config.clone())
    }

    /// Opaque payload the task was registered with
    #[must_use]
    pub fn plugin_data(&self, task_id: TaskId) -> Option<Vec<u8>> {
        self.lock().tasks.get(&task_id).map(|t| t.plugin_data.clone())
    }

    /// Descriptor of a registered task
    #[must_use]
    pub fn descriptor(&self, task_id: TaskId) -> Option<TaskDescriptor> {
        self.lock().tasks.get(&task_id).map(|t| t.descriptor.clone())
    }

    /// Number of registered tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Whether shutdown was signalled
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }
}

impl TaskManagerPlugin for StreamingPlugin {
    fn register_task(
        &self,
        task: &TaskDescriptor,
        job_config: &QosConfig,
        plugin_data: &[u8],
    ) -> Result<(), PluginError> {
        job_config.validate()?;

        let mut registry = self.lock();
        if registry.shut_down {
            return Err(PluginError::ShuttingDown);
        }
        if registry.tasks.contains_key(&task.task_id) {
            return Err(PluginError::AlreadyRegistered(task.task_id));
        }

        let chooser = InputChannelChooser::from_config(job_config);
        registry.tasks.insert(
            task.task_id,
            RegisteredTask {
                descriptor: task.clone(),
                config: job_config.clone(),
                plugin_data: plugin_data.to_vec(),
                notifier: chooser.notifier(),
                chooser: Some(chooser),
            },
        );

        tracing::info!(task = %task.task_id, vertex = %task.vertex_id, name = %task.name, "task registered");
        Ok(())
    }

    fn unregister_task(&self, task_id: TaskId) -> Result<(), PluginError> {
        let task = self
            .lock()
            .tasks
            .shift_remove(&task_id)
            .ok_or(PluginError::NotRegistered(task_id))?;

        // a reader still waiting for input must not outlive its task
        task.notifier.interrupt();
        tracing::info!(task = %task_id, name = %task.descriptor.name, "task unregistered");
        Ok(())
    }

    fn shutdown(&self) {
        let mut registry = self.lock();
        registry.shut_down = true;
        let tasks = registry.tasks.len();
        for (_, task) in registry.tasks.drain(..) {
            task.notifier.set_blocking(false);
            task.notifier.interrupt();
        }
        tracing::info!(tasks, "streaming plugin shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::{ChannelChoice, ChooserError};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn descriptor(name: &str) -> TaskDescriptor {
        TaskDescriptor::new(TaskId::new(), VertexId::from_name(name), name)
    }

    #[test]
    fn test_register_and_take_chooser() {
        let plugin = StreamingPlugin::new();
        let task = descriptor("map.0");
        plugin.register_task(&task, &QosConfig::default(), b"payload").unwrap();

        assert_eq!(plugin.task_count(), 1);
        assert_eq!(plugin.descriptor(task.task_id), Some(task.clone()));
        assert_eq!(plugin.plugin_data(task.task_id), Some(b"payload".to_vec()));

        let mut chooser = plugin.take_chooser(task.task_id).unwrap();
        assert!(plugin.take_chooser(task.task_id).is_none());

        plugin.notifier(task.task_id).unwrap().notify_available(2);
        assert_eq!(chooser.choose_next(), Ok(ChannelChoice::Channel(2)));
    }

    #[test]
    fn test_register_twice_rejected() {
        let plugin = StreamingPlugin::new();
        let task = descriptor("map.0");
        plugin.register_task(&task, &QosConfig::default(), &[]).unwrap();

        assert_eq!(
            plugin.register_task(&task, &QosConfig::default(), &[]),
            Err(PluginError::AlreadyRegistered(task.task_id))
        );
    }

    #[test]
    fn test_register_invalid_config_rejected() {
        let plugin = StreamingPlugin::new();
        let config = QosConfig::new().with_statistics_window_size(0);

        let result = plugin.register_task(&descriptor("map.0"), &config, &[]);
        assert!(matches!(
            result,
            Err(PluginError::InvalidConfiguration(CoreError::Validation { ref field, .. }))
                if field == "statistics_window_size"
        ));
        assert_eq!(plugin.task_count(), 0);
    }

    #[test]
    fn test_chooser_uses_job_config() {
        let plugin = StreamingPlugin::new();
        let task = descriptor("map.0");
        let config = QosConfig::new().with_blocking(false);
        plugin.register_task(&task, &config, &[]).unwrap();

        assert_eq!(plugin.config(task.task_id), Some(config));
        let mut chooser = plugin.take_chooser(task.task_id).unwrap();
        assert_eq!(chooser.choose_next(), Ok(ChannelChoice::NoneAvailable));
    }

    #[test]
    fn test_unregister_interrupts_reader() {
        let plugin = Arc::new(StreamingPlugin::new());
        let task = descriptor("map.0");
        plugin.register_task(&task, &QosConfig::default(), &[]).unwrap();

        let mut chooser = plugin.take_chooser(task.task_id).unwrap();
        let reader = thread::spawn(move || chooser.choose_next());
        thread::sleep(Duration::from_millis(50));

        plugin.unregister_task(task.task_id).unwrap();
        assert_eq!(reader.join().unwrap(), Err(ChooserError::Interrupted));
        assert_eq!(plugin.task_count(), 0);
        assert_eq!(
            plugin.unregister_task(task.task_id),
            Err(PluginError::NotRegistered(task.task_id))
        );
    }

    #[test]
    fn test_shutdown_drains_tasks() {
        let plugin = StreamingPlugin::new();
        let first = descriptor("map.0");
        let second = descriptor("map.1");
        plugin.register_task(&first, &QosConfig::default(), &[]).unwrap();
        plugin.register_task(&second, &QosConfig::default(), &[]).unwrap();

        let notifier = plugin.notifier(first.task_id).unwrap();
        plugin.shutdown();

        assert!(plugin.is_shut_down());
        assert_eq!(plugin.task_count(), 0);
        assert!(!notifier.is_blocking());
        assert_eq!(
            plugin.register_task(&descriptor("map.2"), &QosConfig::default(), &[]),
            Err(PluginError::ShuttingDown)
        );
    }

    #[test]
    fn test_plugin_as_trait_object() {
        let plugin: Box<dyn TaskManagerPlugin> = Box::new(StreamingPlugin::new());
        let task = descriptor("sink.0");
        plugin.register_task(&task, &QosConfig::default(), &[]).unwrap();
        plugin.unregister_task(task.task_id).unwrap();
        plugin.shutdown();
    }
}
