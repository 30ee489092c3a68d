use anyhow::{Context, anyhow};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use task_tracker::app_env::{self, AuthBackend};
use task_tracker::persistence::ConfiguredCredentialVerifier;
use task_tracker::persistence::db_user_driven_ports::DbCredentialVerifier;
use task_tracker::persistence::hosted_auth_driven_ports::HostedCredentialVerifier;
use task_tracker::session::{self, SessionKeys};
use task_tracker::{SharedData, build_router, db, logging, persistence};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => Some(logging::init_exporters(&span_url, &metric_url)?),
        _ => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter()?, otel_exporters);

    let db_url = env::var(app_env::DB_URL)
        .with_context(|| format!("{} must be set", app_env::DB_URL))?;
    let pool = db::connect_sqlx(&db_url).await?;
    db::run_migrations(&pool).await?;

    let shared_data = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(pool)?,
        sessions: session_keys_from_env()?,
        credential_verifier: credential_verifier_from_env()?,
    });

    let listen_addr =
        env::var(app_env::LISTEN_ADDR).unwrap_or_else(|_| app_env::DEFAULT_LISTEN_ADDR.to_owned());
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("binding to {listen_addr}"))?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, build_router(shared_data))
        .await
        .context("serving HTTP")
}

fn session_keys_from_env() -> Result<SessionKeys, anyhow::Error> {
    let secret = env::var(app_env::SESSION_SECRET)
        .with_context(|| format!("{} must be set", app_env::SESSION_SECRET))?;
    if secret.is_empty() {
        return Err(anyhow!("{} must not be empty", app_env::SESSION_SECRET));
    }

    let ttl_minutes = match env::var(app_env::SESSION_TTL_MINUTES) {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("{} must be a whole number", app_env::SESSION_TTL_MINUTES))?,
        Err(_) => app_env::DEFAULT_SESSION_TTL_MINUTES,
    };

    let lifetime = session::session_lifetime(ttl_minutes)
        .with_context(|| format!("invalid {}", app_env::SESSION_TTL_MINUTES))?;

    Ok(SessionKeys::new(secret.as_bytes(), lifetime))
}

fn credential_verifier_from_env() -> Result<ConfiguredCredentialVerifier, anyhow::Error> {
    let backend: AuthBackend = env::var(app_env::AUTH_BACKEND)
        .unwrap_or_default()
        .parse()?;
    info!(?backend, "Configured sign-in backend");

    let verifier = match backend {
        AuthBackend::Database => ConfiguredCredentialVerifier::Database(DbCredentialVerifier),
        AuthBackend::Hosted => ConfiguredCredentialVerifier::Hosted(HostedCredentialVerifier {
            base_url: env::var(app_env::AUTH_SERVICE_URL)
                .with_context(|| format!("{} must be set for hosted sign-in", app_env::AUTH_SERVICE_URL))?,
            api_key: env::var(app_env::AUTH_SERVICE_KEY)
                .with_context(|| format!("{} must be set for hosted sign-in", app_env::AUTH_SERVICE_KEY))?,
        }),
    };

    Ok(verifier)
}
