//! Threshold checks, on demand and in the background.
//!
//! [`CheckScheduler`] drives the lifecycle manager over the hives listed by a
//! [`HiveDirectory`], reading samples from a [`SampleSource`]. A check can run
//! synchronously with [`CheckScheduler::check_now`] or be queued with
//! [`CheckScheduler::schedule_check`], which records a [`CheckTask`] and runs
//! the sweep on tokio's blocking pool.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{AlertError, Result};
use crate::lifecycle::{AlertLifecycleManager, EvaluationResult, HiveReadings, SweepStatus};
use crate::source::{HiveDirectory, InMemorySampleSource, SampleSource, StaticHiveDirectory};
use crate::store::{ThresholdSource, ThresholdStore};
use crate::types::HiveId;

/// Unique identifier for a scheduled check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a task ID from a string.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskNotFound` if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(|_| AlertError::TaskNotFound { id: s.to_string() })?;
        Ok(Self(uuid))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a scheduled check is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Recorded, not yet started.
    Queued,
    /// Sweep in progress.
    Running,
    /// Sweep finished.
    Completed,
    /// Sweep could not run, or every hive in it failed.
    Failed,
}

impl TaskState {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use TaskState::{Completed, Failed, Queued, Running};

        matches!(
            (self, target),
            (Queued, Running) | (Running, Completed) | (Queued | Running, Failed)
        )
    }

    /// Returns true once the task can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A check recorded by [`CheckScheduler::schedule_check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckTask {
    /// Task identifier.
    pub id: TaskId,
    /// The hive to check, or `None` for every hive.
    pub hive_id: Option<HiveId>,
    /// Current state.
    pub state: TaskState,
    /// When the task was queued.
    pub queued_at: DateTime<Utc>,
    /// When the sweep started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// The sweep outcome, if the sweep ran.
    pub result: Option<EvaluationResult>,
    /// Why the sweep could not run.
    pub error: Option<String>,
}

impl CheckTask {
    fn queued(hive_id: Option<HiveId>) -> Self {
        Self {
            id: TaskId::new(),
            hive_id,
            state: TaskState::Queued,
            queued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// Moves the task to a new state, stamping the matching timestamp.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidTransition` if the move is not allowed.
    pub fn transition_to(&mut self, target: TaskState) -> Result<()> {
        if !self.state.can_transition_to(&target) {
            return Err(AlertError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        match target {
            TaskState::Running => self.started_at = Some(Utc::now()),
            TaskState::Completed | TaskState::Failed => self.finished_at = Some(Utc::now()),
            TaskState::Queued => {}
        }
        self.state = target;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TaskBook {
    tasks: HashMap<TaskId, CheckTask>,
    order: VecDeque<TaskId>,
    signals: HashMap<TaskId, watch::Sender<TaskState>>,
}

impl TaskBook {
    fn insert(&mut self, task: CheckTask) {
        let (tx, _) = watch::channel(task.state);
        self.order.push_back(task.id);
        self.signals.insert(task.id, tx);
        self.tasks.insert(task.id, task);
    }

    fn update<F>(&mut self, id: TaskId, f: F) -> Result<()>
    where
        F: FnOnce(&mut CheckTask) -> Result<()>,
    {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| AlertError::TaskNotFound { id: id.to_string() })?;
        f(task)?;
        if let Some(signal) = self.signals.get(&id) {
            signal.send_replace(task.state);
        }
        Ok(())
    }

    /// Returns true if the task has finished and nobody is waiting on it.
    fn is_prunable(&self, id: &TaskId) -> bool {
        self.tasks.get(id).is_some_and(|t| t.state.is_terminal())
            && self
                .signals
                .get(id)
                .is_none_or(|signal| signal.receiver_count() == 0)
    }

    /// Drops the oldest finished tasks beyond `keep`. Tasks with a pending
    /// `wait` are never dropped and do not count against `keep`.
    fn prune(&mut self, keep: usize) {
        let prunable: Vec<TaskId> = self
            .order
            .iter()
            .filter(|id| self.is_prunable(id))
            .copied()
            .collect();
        let excess = prunable.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }

        for id in &prunable[..excess] {
            self.tasks.remove(id);
            self.signals.remove(id);
        }
        let tasks = &self.tasks;
        self.order.retain(|id| tasks.contains_key(id));
    }
}

/// Runs threshold checks over the hive directory.
pub struct CheckScheduler<S = ThresholdStore, P = InMemorySampleSource, D = StaticHiveDirectory> {
    manager: AlertLifecycleManager<S>,
    samples: Arc<P>,
    directory: Arc<D>,
    config: SchedulerConfig,
    book: Arc<RwLock<TaskBook>>,
}

impl<S, P, D> CheckScheduler<S, P, D>
where
    S: ThresholdSource + 'static,
    P: SampleSource + 'static,
    D: HiveDirectory + 'static,
{
    /// Creates a scheduler with the default configuration.
    #[must_use]
    pub fn new(manager: AlertLifecycleManager<S>, samples: Arc<P>, directory: Arc<D>) -> Self {
        Self::with_config(manager, samples, directory, SchedulerConfig::default())
    }

    /// Creates a scheduler with a custom configuration.
    #[must_use]
    ///
    /// A `max_task_history` of zero is raised to one so a finished task can
    /// still be read back.
    pub fn with_config(
        manager: AlertLifecycleManager<S>,
        samples: Arc<P>,
        directory: Arc<D>,
        mut config: SchedulerConfig,
    ) -> Self {
        if config.max_task_history == 0 {
            warn!("max_task_history of 0 raised to 1");
            config.max_task_history = 1;
        }
        Self {
            manager,
            samples,
            directory,
            config,
            book: Arc::new(RwLock::new(TaskBook::default())),
        }
    }

    /// Returns the lifecycle manager.
    #[must_use]
    pub const fn manager(&self) -> &AlertLifecycleManager<S> {
        &self.manager
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs a check immediately, over one hive or every hive in the directory.
    ///
    /// Failures of individual hives are reported in the result.
    ///
    /// # Errors
    ///
    /// Returns an error only if the hive directory cannot be read.
    pub fn check_now(&self, hive_id: Option<&HiveId>) -> Result<EvaluationResult> {
        let hive_ids = match hive_id {
            Some(id) => vec![id.clone()],
            None => self.directory.hive_ids()?,
        };
        debug!(hives = hive_ids.len(), "running threshold check");

        Ok(self.manager.sweep_with(&hive_ids, |id| {
            Ok(HiveReadings {
                samples: self.samples.samples(id)?,
                last_inspection: self.directory.last_inspection(id),
            })
        }))
    }

    /// Queues a check on the blocking pool and returns its task ID.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Scheduler` if called outside a tokio runtime.
    pub fn schedule_check(&self, hive_id: Option<HiveId>) -> Result<TaskId> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| AlertError::Scheduler {
            reason: format!("no tokio runtime: {e}"),
        })?;

        let task = CheckTask::queued(hive_id);
        let id = task.id;
        {
            let mut book = self.book.write();
            book.prune(self.config.max_task_history);
            book.insert(task);
        }
        info!(task_id = %id, "queued threshold check");

        let scheduler = self.clone();
        runtime.spawn_blocking(move || scheduler.run_task(id));
        Ok(id)
    }

    fn run_task(&self, id: TaskId) {
        let hive_id = {
            let mut book = self.book.write();
            if let Err(e) = book.update(id, |t| t.transition_to(TaskState::Running)) {
                error!(task_id = %id, error = %e, "failed to start threshold check");
                return;
            }
            book.tasks.get(&id).and_then(|t| t.hive_id.clone())
        };

        let outcome = self.check_now(hive_id.as_ref());

        let mut book = self.book.write();
        let finished = book.update(id, |task| match outcome {
            Ok(result) => {
                let target = match result.status() {
                    SweepStatus::Completed => TaskState::Completed,
                    SweepStatus::Failed => TaskState::Failed,
                };
                task.result = Some(result);
                task.transition_to(target)
            }
            Err(e) => {
                warn!(task_id = %id, error = %e, "threshold check failed");
                task.error = Some(e.to_string());
                task.transition_to(TaskState::Failed)
            }
        });
        if let Err(e) = finished {
            error!(task_id = %id, error = %e, "failed to finish threshold check");
        }
    }

    /// Returns a task by ID.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<CheckTask> {
        self.book.read().tasks.get(&id).cloned()
    }

    /// Returns all recorded tasks, newest first.
    #[must_use]
    pub fn tasks(&self) -> Vec<CheckTask> {
        let book = self.book.read();
        book.order
            .iter()
            .rev()
            .filter_map(|id| book.tasks.get(id).cloned())
            .collect()
    }

    /// Waits for a task to finish and returns its final record.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskNotFound` if the task is unknown or was
    /// pruned from the history. History is pruned only when a new check is
    /// queued, keeping the newest `max_task_history` finished tasks.
    pub async fn wait(&self, id: TaskId) -> Result<CheckTask> {
        let signal = self.book.read().signals.get(&id).map(watch::Sender::subscribe);
        if let Some(mut rx) = signal {
            // a closed channel means the task was pruned; the lookup below reports it
            let _ = rx.wait_for(TaskState::is_terminal).await;
        }
        self.task(id)
            .ok_or_else(|| AlertError::TaskNotFound { id: id.to_string() })
    }

    /// Starts a background loop that queues a full check every `interval`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Scheduler` if `interval` is zero or if called
    /// outside a tokio runtime.
    pub fn spawn_periodic(&self, interval: Duration) -> Result<JoinHandle<()>> {
        if interval.is_zero() {
            return Err(AlertError::Scheduler {
                reason: "periodic check interval must be greater than zero".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| AlertError::Scheduler {
            reason: format!("no tokio runtime: {e}"),
        })?;

        let scheduler = self.clone();
        info!(interval_secs = interval.as_secs_f64(), "starting periodic threshold checks");
        Ok(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match scheduler.schedule_check(None) {
                    Ok(id) => {
                        if let Err(e) = scheduler.wait(id).await {
                            warn!(task_id = %id, error = %e, "lost track of periodic check");
                        }
                    }
                    Err(e) => error!(error = %e, "failed to queue periodic check"),
                }
            }
        }))
    }

    /// Starts the periodic loop at the configured interval.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Scheduler` if `interval_secs` is zero or if called
    /// outside a tokio runtime.
    pub fn spawn_configured(&self) -> Result<JoinHandle<()>> {
        self.spawn_periodic(Duration::from_secs(self.config.interval_secs))
    }
}

impl<S, P, D> Clone for CheckScheduler<S, P, D> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            samples: Arc::clone(&self.samples),
            directory: Arc::clone(&self.directory),
            config: self.config.clone(),
            book: Arc::clone(&self.book),
        }
    }
}

impl<S, P, D> fmt::Debug for CheckScheduler<S, P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckScheduler")
            .field("manager", &self.manager)
            .field("config", &self.config)
            .field("tasks", &self.book.read().tasks.len())
            .finish_non_exhaustive()
    }
}
