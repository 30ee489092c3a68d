use crate::domain;
use crate::domain::task::{Task, TaskFilter, TaskPriority, TaskStatus};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query, query_as};
use tracing::instrument;
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, priority, due_date, created_at, updated_at";

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(value: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: value.id,
            owner_user_id: value.user_id,
            title: value.title,
            description: value.description,
            status: status_from_db(&value.status)?,
            priority: priority_from_db(&value.priority)?,
            due_date: value.due_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Completed => "completed",
    }
}

fn status_from_db(status: &str) -> Result<TaskStatus, Error> {
    match status {
        "todo" => Ok(TaskStatus::Todo),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(anyhow!("unrecognized task status in database: {other}")),
    }
}

fn priority_to_db(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

fn priority_from_db(priority: &str) -> Result<TaskPriority, Error> {
    match priority {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        other => Err(anyhow!("unrecognized task priority in database: {other}")),
    }
}

pub struct DbTaskReader;

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    #[instrument(skip(self, ext_cxn))]
    async fn tasks_for_user(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM task t \
             WHERE t.user_id = $1 \
               AND ($2::text IS NULL OR t.status = $2) \
               AND ($3::text IS NULL OR t.priority = $3) \
             ORDER BY t.created_at DESC"
        );
        let rows = query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(filter.status.map(status_to_db))
            .bind(filter.priority.map(priority_to_db))
            .fetch_all(cxn.borrow_connection())
            .await
            .context("trying to fetch tasks for a user")?;

        rows.into_iter().map(Task::try_from).collect()
    }

    #[instrument(skip(self, ext_cxn))]
    async fn user_task_by_id(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let sql = format!("SELECT {TASK_COLUMNS} FROM task t WHERE t.user_id = $1 AND t.id = $2");
        let row = query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(task_id)
            .fetch_optional(cxn.borrow_connection())
            .await
            .context("trying to fetch a task by ID")?;

        row.map(Task::try_from).transpose()
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    #[instrument(skip_all, fields(task_id = %task.id, user_id = %task.owner_user_id))]
    async fn insert_task(
        &self,
        task: &Task,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "INSERT INTO task(id, user_id, title, description, status, priority, due_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(task.id)
        .bind(task.owner_user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(status_to_db(task.status))
        .bind(priority_to_db(task.priority))
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to insert a new task into the database")?;

        Ok(())
    }

    #[instrument(skip_all, fields(task_id = %task.id, user_id = %task.owner_user_id))]
    async fn update_task(
        &self,
        task: &Task,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "UPDATE task SET title = $1, description = $2, status = $3, priority = $4, due_date = $5, updated_at = $6 \
             WHERE id = $7 AND user_id = $8",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(status_to_db(task.status))
        .bind(priority_to_db(task.priority))
        .bind(task.due_date)
        .bind(task.updated_at)
        .bind(task.id)
        .bind(task.owner_user_id)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to update a task in the database")?;

        Ok(())
    }

    #[instrument(skip(self, ext_cxn))]
    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query("DELETE FROM task WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a task from the database")?;

        Ok(())
    }
}
