//! Seeds the demo accounts and a starter task list for each of them.
//!
//! ```bash
//! # Seed using DATABASE_URL from the environment (or .env)
//! cargo run --bin seed-demo-data
//!
//! # Wipe the demo accounts' tasks and start over
//! cargo run --bin seed-demo-data -- --reset
//! ```

use anyhow::{Context, anyhow};
use chrono::{Duration, Utc};
use clap::Parser;
use dotenv::dotenv;
use sqlx::PgPool;
use std::env;
use task_tracker::domain::task::driven_ports::{TaskReader, TaskWriter};
use task_tracker::domain::task::{Task, TaskFilter, TaskPriority, TaskStatus};
use task_tracker::persistence::db_task_driven_ports::{DbTaskReader, DbTaskWriter};
use task_tracker::{app_env, db, persistence};
use tracing::info;
use uuid::Uuid;

/// Password shared by every demo account
const DEMO_PASSWORD: &str = "qweqwe";

#[derive(Parser)]
#[command(
    name = "seed-demo-data",
    about = "Task Tracker demo data seeder",
    long_about = "Creates the demo accounts with bcrypt-hashed passwords and gives each a starter task list"
)]
struct SeedArgs {
    /// Database URL override (defaults to DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Password for the demo accounts
    #[arg(long, default_value = DEMO_PASSWORD)]
    password: String,

    /// Delete the demo accounts' existing tasks before seeding
    #[arg(long)]
    reset: bool,
}

struct DemoUser {
    id: Uuid,
    email: &'static str,
    name: &'static str,
}

const DEMO_USERS: [DemoUser; 2] = [
    DemoUser {
        id: Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440001),
        email: "lola@mail.com",
        name: "Lola Demo",
    },
    DemoUser {
        id: Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440002),
        email: "leo@mail.com",
        name: "Leo Demo",
    },
];

/// Title, description, status, priority, and days until due (negative is overdue)
const STARTER_TASKS: &[(&str, &str, TaskStatus, TaskPriority, Option<i64>)] = &[
    (
        "Implement Authentication",
        "Set up sign-in with the credentials provider",
        TaskStatus::Completed,
        TaskPriority::High,
        Some(-3),
    ),
    (
        "Design Database Schema",
        "Create tables for users, tasks, and terms of service",
        TaskStatus::InProgress,
        TaskPriority::High,
        Some(2),
    ),
    (
        "Build Task Dashboard",
        "Show task counts and the completion rate",
        TaskStatus::Todo,
        TaskPriority::Medium,
        Some(7),
    ),
    (
        "Write API Documentation",
        "Document every endpoint with OpenAPI",
        TaskStatus::Todo,
        TaskPriority::Low,
        None,
    ),
];

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    tracing_subscriber::fmt().init();
    let args = SeedArgs::parse();

    let db_url = match args.database_url {
        Some(url) => url,
        None => env::var(app_env::DB_URL)
            .with_context(|| format!("pass --database-url or set {}", app_env::DB_URL))?,
    };
    if args.password.is_empty() {
        return Err(anyhow!("the demo password must not be empty"));
    }

    let pool = db::connect_sqlx(&db_url).await?;
    db::run_migrations(&pool).await?;

    let password_hash = {
        let password = args.password.clone();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await
            .context("joining password hashing task")?
            .context("hashing the demo password")?
    };

    let mut ext_cxn = persistence::ExternalConnectivity::new(pool.clone())?;
    for user in &DEMO_USERS {
        upsert_demo_user(&pool, user, &password_hash).await?;
        seed_tasks(&pool, &mut ext_cxn, user, args.reset).await?;
    }

    info!("Demo data ready, sign in with any demo email and the demo password");
    Ok(())
}

async fn upsert_demo_user(
    pool: &PgPool,
    user: &DemoUser,
    password_hash: &str,
) -> Result<(), anyhow::Error> {
    sqlx::query(
        "INSERT INTO app_user(id, email, name, password_hash) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, \
         password_hash = EXCLUDED.password_hash, updated_at = now()",
    )
    .bind(user.id)
    .bind(user.email)
    .bind(user.name)
    .bind(password_hash)
    .execute(pool)
    .await
    .with_context(|| format!("upserting demo user {}", user.email))?;
    info!(email = user.email, "Demo user ready");

    Ok(())
}

async fn seed_tasks(
    pool: &PgPool,
    ext_cxn: &mut persistence::ExternalConnectivity,
    user: &DemoUser,
    reset: bool,
) -> Result<(), anyhow::Error> {
    if reset {
        let removed = sqlx::query("DELETE FROM task WHERE user_id = $1")
            .bind(user.id)
            .execute(pool)
            .await
            .context("clearing demo tasks")?
            .rows_affected();
        info!(email = user.email, removed, "Cleared existing tasks");
    }

    let existing = DbTaskReader
        .tasks_for_user(user.id, &TaskFilter::default(), &mut *ext_cxn)
        .await?;
    if !existing.is_empty() {
        info!(email = user.email, "User already has tasks, leaving them alone");
        return Ok(());
    }

    let now = Utc::now();
    for (offset, (title, description, status, priority, due_in_days)) in
        STARTER_TASKS.iter().enumerate()
    {
        // Stagger creation times so the list has a stable newest-first order
        let created_at = now - Duration::hours(offset as i64);
        let task = Task {
            id: Uuid::new_v4(),
            owner_user_id: user.id,
            title: (*title).to_owned(),
            description: Some((*description).to_owned()),
            status: *status,
            priority: *priority,
            due_date: due_in_days.map(|days| now + Duration::days(days)),
            created_at,
            updated_at: created_at,
        };
        DbTaskWriter.insert_task(&task, &mut *ext_cxn).await?;
    }
    info!(email = user.email, count = STARTER_TASKS.len(), "Seeded starter tasks");

    Ok(())
}
