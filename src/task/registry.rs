use std::sync::Arc;

use super::display_metrics::DisplayMetrics;
use super::route_landing::RouteLanding;
use super::types::Task;
use crate::error::{HarnessError, HarnessResult};

/// The fixed set of tasks available to a run.
///
/// Built once at startup; order is registration order and is the order
/// work items are enqueued in.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in tasks
    pub fn builtin() -> Self {
        Self::new()
            .with(RouteLanding::new())
            .with(DisplayMetrics)
    }

    /// Register a task. A later task with the same id replaces the earlier one.
    pub fn with(mut self, task: impl Task + 'static) -> Self {
        self.register(Arc::new(task));
        self
    }

    pub fn register(&mut self, task: Arc<dyn Task>) {
        match self.tasks.iter().position(|t| t.id() == task.id()) {
            Some(i) => self.tasks[i] = task,
            None => self.tasks.push(task),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.iter().find(|t| t.id() == id).cloned()
    }

    /// Keep only the named tasks; an empty selection keeps everything
    pub fn select(&self, ids: &[String]) -> HarnessResult<TaskRegistry> {
        if ids.is_empty() {
            return Ok(self.clone());
        }
        let mut selected = TaskRegistry::new();
        for id in ids {
            let task = self.get(id).ok_or_else(|| {
                HarnessError::Config(format!(
                    "unknown task `{}` (available: {})",
                    id,
                    self.ids().join(", ")
                ))
            })?;
            selected.register(task);
        }
        Ok(selected)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id()).collect()
    }

    /// `id  description` lines, ids padded to a common width
    pub fn listing(&self) -> Vec<String> {
        let width = self.tasks.iter().map(|t| t.id().len()).max().unwrap_or(0);
        self.tasks
            .iter()
            .map(|t| format!("{:<width$}  {}", t.id(), t.description(), width = width))
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
