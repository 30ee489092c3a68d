use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl From<TaskStatus> for domain::task::TaskStatus {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Todo => domain::task::TaskStatus::Todo,
            TaskStatus::InProgress => domain::task::TaskStatus::InProgress,
            TaskStatus::Completed => domain::task::TaskStatus::Completed,
        }
    }
}

impl From<domain::task::TaskStatus> for TaskStatus {
    fn from(value: domain::task::TaskStatus) -> Self {
        match value {
            domain::task::TaskStatus::Todo => TaskStatus::Todo,
            domain::task::TaskStatus::InProgress => TaskStatus::InProgress,
            domain::task::TaskStatus::Completed => TaskStatus::Completed,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl From<TaskPriority> for domain::task::TaskPriority {
    fn from(value: TaskPriority) -> Self {
        match value {
            TaskPriority::Low => domain::task::TaskPriority::Low,
            TaskPriority::Medium => domain::task::TaskPriority::Medium,
            TaskPriority::High => domain::task::TaskPriority::High,
        }
    }
}

impl From<domain::task::TaskPriority> for TaskPriority {
    fn from(value: domain::task::TaskPriority) -> Self {
        match value {
            domain::task::TaskPriority::Low => TaskPriority::Low,
            domain::task::TaskPriority::Medium => TaskPriority::Medium,
            domain::task::TaskPriority::High => TaskPriority::High,
        }
    }
}

/// DTO for a task returned on the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq, Eq))]
pub struct TaskRecord {
    pub id: Uuid,
    #[schema(example = "Implement Authentication")]
    pub title: String,
    #[schema(example = "Setup sign-in with the credentials provider")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::task::Task> for TaskRecord {
    fn from(value: domain::task::Task) -> Self {
        TaskRecord {
            id: value.id,
            title: value.title,
            description: value.description,
            status: value.status.into(),
            priority: value.priority.into(),
            due_date: value.due_date,
            user_id: value.owner_user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for creating a new task via the API
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewTask {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Design Database Schema")]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Defaults to `todo`
    pub status: Option<TaskStatus>,
    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl From<NewTask> for domain::task::NewTask {
    fn from(value: NewTask) -> Self {
        domain::task::NewTask {
            title: value.title,
            description: value.description,
            status: value.status.map(Into::into),
            priority: value.priority.map(Into::into),
            due_date: value.due_date,
        }
    }
}

/// DTO for partially updating a task via the API. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl From<UpdateTask> for domain::task::UpdateTask {
    fn from(value: UpdateTask) -> Self {
        domain::task::UpdateTask {
            title: value.title,
            description: value.description,
            status: value.status.map(Into::into),
            priority: value.priority.map(Into::into),
            due_date: value.due_date,
        }
    }
}

/// Query parameters for narrowing the task list
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl From<TaskListQuery> for domain::task::TaskFilter {
    fn from(value: TaskListQuery) -> Self {
        domain::task::TaskFilter {
            status: value.status.map(Into::into),
            priority: value.priority.map(Into::into),
        }
    }
}

/// DTO confirming a deleted task
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct DeletedTask {
    #[schema(example = true)]
    pub success: bool,
    pub id: Uuid,
}

/// DTO summarizing a user's tasks for the dashboard
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq, Eq))]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    #[schema(example = 4)]
    pub total: u64,
    #[schema(example = 2)]
    pub completed: u64,
    #[schema(example = 1)]
    pub in_progress: u64,
    #[schema(example = 1)]
    pub todo: u64,
    #[schema(example = 50)]
    pub completion_rate: u8,
}

impl From<domain::task::TaskStats> for TaskStats {
    fn from(value: domain::task::TaskStats) -> Self {
        TaskStats {
            total: value.total,
            completed: value.completed,
            in_progress: value.in_progress,
            todo: value.todo,
            completion_rate: value.completion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_task_data_gets_rejected() {
        let bad_task = NewTask {
            title: String::new(),
            description: Some((0..2001).map(|_| "A").collect()),
            status: None,
            priority: None,
            due_date: None,
        };
        let validation_result = bad_task.validate();
        assert!(validation_result.is_err());
        let validation_errors = validation_result.unwrap_err();
        let field_validations = validation_errors.field_errors();
        assert!(field_validations.contains_key("title"));
        assert!(field_validations.contains_key("description"));
    }

    #[test]
    fn empty_update_is_valid() {
        let update: UpdateTask = serde_json::from_str("{}").expect("empty update should parse");
        assert!(update.validate().is_ok());
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        let parsed = serde_json::from_str::<UpdateTask>(r#"{"status": "archived"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn statuses_use_snake_case() {
        let parsed: UpdateTask = serde_json::from_str(r#"{"status": "in_progress", "priority": "high"}"#)
            .expect("update should parse");
        assert_eq!(Some(TaskStatus::InProgress), parsed.status);
        assert_eq!(Some(TaskPriority::High), parsed.priority);
    }
}
