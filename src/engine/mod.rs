//! Task dispatching.
//!
//! Every mapping of a pipeline becomes one [`Task`], registered by name in a
//! [`Registry`]. A registry can run all of its tasks at once on the rayon
//! pool, or stay alive in watch mode and re-run only the tasks affected by a
//! batch of file changes.

mod runner;
#[cfg(feature = "live")]
mod watch;

use std::fmt::{Display, Formatter};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::RegistryError;
use crate::output::normalize_path;

#[cfg(feature = "live")]
pub use watch::watch;

/// A named, independently runnable unit of work.
pub trait Task: Send + Sync {
    /// Display name of the task, derived from the file it writes.
    fn name(&self) -> &str;

    /// Files written by the task, relative to the project root. No two
    /// tasks of a registry may write the same file.
    fn outputs(&self) -> Vec<Utf8PathBuf>;

    /// Run the task once.
    fn run(&self) -> anyhow::Result<()>;

    /// Directories which should be watched for changes, relative to the
    /// project root.
    fn watched(&self) -> Vec<Utf8PathBuf>;

    /// Whether a changed path, relative to the project root, requires this
    /// task to run again.
    fn is_dirty(&self, path: &Utf8Path) -> bool;
}

/// The set of tasks making up one build step.
#[derive(Default)]
pub struct Registry {
    tasks: Vec<Box<dyn Task>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. A task writing a file already written by another
    /// registered task is rejected.
    pub fn register(&mut self, task: impl Task + 'static) -> Result<(), RegistryError> {
        for output in task.outputs() {
            let output = normalize_path(&output);
            if let Some(other) = self
                .tasks
                .iter()
                .find(|t| t.outputs().iter().any(|o| normalize_path(o) == output))
            {
                return Err(RegistryError::Duplicate(
                    output,
                    other.name().to_string(),
                    task.name().to_string(),
                ));
            }
        }

        tracing::debug!("registered task {}", task.name());
        self.tasks.push(Box::new(task));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Run every registered task concurrently.
    pub fn run(&self) -> Report {
        let tasks: Vec<_> = self.tasks.iter().map(Box::as_ref).collect();
        runner::run_parallel(&tasks)
    }

    /// Run only the tasks at the given indices concurrently.
    pub fn run_only(&self, indices: &[usize]) -> Report {
        let tasks: Vec<_> = indices
            .iter()
            .filter_map(|&i| self.tasks.get(i))
            .map(Box::as_ref)
            .collect();
        runner::run_parallel(&tasks)
    }

    /// Select the tasks affected by a batch of changed paths.
    ///
    /// Scanning for a task stops at the first path that makes it dirty, so a
    /// task is selected at most once per batch no matter how many of its
    /// files changed.
    pub fn select_dirty(&self, paths: &[Utf8PathBuf]) -> Vec<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| paths.iter().any(|path| task.is_dirty(path)))
            .map(|(i, _)| i)
            .collect()
    }

    /// All directories watched by the registered tasks.
    pub fn watched(&self) -> Vec<Utf8PathBuf> {
        let mut watched: Vec<_> = self.tasks.iter().flat_map(|task| task.watched()).collect();
        watched.sort();
        watched.dedup();
        watched
    }
}

/// Outcome of a single task run.
#[derive(Debug)]
pub struct TaskReport {
    pub name: String,
    pub duration: Duration,
    pub error: Option<anyhow::Error>,
}

/// Outcome of running a set of tasks.
#[derive(Debug, Default)]
pub struct Report {
    pub tasks: Vec<TaskReport>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|task| task.error.is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|task| task.error.is_some())
    }

    pub fn merge(&mut self, other: Report) {
        self.tasks.extend(other.tasks);
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let failed = self.failures().count();
        write!(
            f,
            "{} tasks, {} succeeded, {} failed",
            self.tasks.len(),
            self.tasks.len() - failed,
            failed
        )?;

        for task in self.failures() {
            if let Some(error) = &task.error {
                write!(f, "\n  {}: {error:#}", task.name)?;
            }
        }

        Ok(())
    }
}
