use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::TaskError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Merges a partial update into this task. Fields missing from the update (and an empty
    /// title) keep their current value.
    fn apply_update(&mut self, update: &UpdateTask, now: DateTime<Utc>) {
        if let Some(title) = update.title.as_ref().filter(|title| !title.is_empty()) {
            self.title = title.clone();
        }
        if let Some(ref description) = update.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Narrows a task listing. Unset fields match everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
    }
}

/// Dashboard summary of a user's tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub todo: u64,
    /// Percentage of completed tasks, rounded to the nearest whole number
    pub completion_rate: u8,
}

impl TaskStats {
    fn from_tasks(tasks: &[Task]) -> TaskStats {
        let count_with = |status: TaskStatus| {
            tasks.iter().filter(|task| task.status == status).count() as u64
        };
        let total = tasks.len() as u64;
        let completed = count_with(TaskStatus::Completed);
        let completion_rate = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u8
        };

        TaskStats {
            total,
            completed,
            in_progress: count_with(TaskStatus::InProgress),
            todo: count_with(TaskStatus::Todo),
            completion_rate,
        }
    }
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    pub trait TaskReader {
        /// Tasks owned by the user which match the filter, newest first
        async fn tasks_for_user(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
        async fn user_task_by_id(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;
    }

    pub trait TaskWriter {
        async fn insert_task(
            &self,
            task: &Task,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        async fn update_task(
            &self,
            task: &Task,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        async fn delete_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("The requested task does not exist.")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[cfg(test)]
    #[allow(clippy::items_after_test_module)]
    mod task_error_clone {
        use super::TaskError;
        use anyhow::anyhow;

        impl Clone for TaskError {
            fn clone(&self) -> Self {
                match self {
                    Self::NotFound => Self::NotFound,
                    Self::PortError(err) => Self::PortError(anyhow!(format!("{}", err))),
                }
            }
        }
    }

    /// Task operations available to a signed-in user. Every operation is scoped to tasks
    /// owned by `user_id`; tasks owned by anyone else behave as if they don't exist.
    pub trait TaskPort {
        async fn list_tasks(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn get_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Task, TaskError>;
        async fn create_task(
            &self,
            user_id: Uuid,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Task, TaskError>;
        async fn update_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            update: &UpdateTask,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Task, TaskError>;
        async fn delete_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Uuid, TaskError>;
        async fn task_stats(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskStats, TaskError>;
    }
}

pub struct TaskService {}

impl TaskService {
    async fn owned_task(
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Task, TaskError> {
        task_read
            .user_task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("looking up a task by ID")?
            .ok_or(TaskError::NotFound)
    }
}

impl driving_ports::TaskPort for TaskService {
    #[instrument(skip(self, ext_cxn, task_read))]
    async fn list_tasks(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks = task_read
            .tasks_for_user(user_id, filter, &mut *ext_cxn)
            .await
            .context("listing tasks for a user")?;

        Ok(tasks)
    }

    #[instrument(skip(self, ext_cxn, task_read))]
    async fn get_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Task, TaskError> {
        Self::owned_task(user_id, task_id, ext_cxn, task_read).await
    }

    #[instrument(skip(self, ext_cxn, task_write))]
    async fn create_task(
        &self,
        user_id: Uuid,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<Task, TaskError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            owner_user_id: user_id,
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            status: new_task.status.unwrap_or(TaskStatus::Todo),
            priority: new_task.priority.unwrap_or(TaskPriority::Medium),
            due_date: new_task.due_date,
            created_at: now,
            updated_at: now,
        };

        task_write
            .insert_task(&task, &mut *ext_cxn)
            .await
            .context("creating a task")?;
        info!(task_id = %task.id, "Created task");

        Ok(task)
    }

    #[instrument(skip(self, ext_cxn, task_read, task_write))]
    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Task, TaskError> {
        let mut task = Self::owned_task(user_id, task_id, &mut *ext_cxn, task_read).await?;
        task.apply_update(update, Utc::now());

        task_write
            .update_task(&task, &mut *ext_cxn)
            .await
            .context("updating a task")?;

        Ok(task)
    }

    #[instrument(skip(self, ext_cxn, task_read, task_write))]
    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Uuid, TaskError> {
        let task = Self::owned_task(user_id, task_id, &mut *ext_cxn, task_read).await?;

        task_write
            .delete_task(user_id, task.id, &mut *ext_cxn)
            .await
            .context("deleting a task")?;

        Ok(task.id)
    }

    #[instrument(skip(self, ext_cxn, task_read))]
    async fn task_stats(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<TaskStats, TaskError> {
        let tasks = task_read
            .tasks_for_user(user_id, &TaskFilter::default(), &mut *ext_cxn)
            .await
            .context("fetching tasks to compute statistics")?;

        Ok(TaskStats::from_tasks(&tasks))
    }
}
