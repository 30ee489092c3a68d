use std::str::FromStr;
use thiserror::Error;

/// URL for accessing the PostgreSQL database
pub const DB_URL: &str = "DATABASE_URL";
/// Log level configuration for the application. Uses [EnvFilter](tracing_subscriber::EnvFilter)
/// directive syntax, e.g. `info,task_tracker=debug`
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Socket address the HTTP server binds to. Defaults to [DEFAULT_LISTEN_ADDR]
pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Secret used to sign session tokens. Required.
pub const SESSION_SECRET: &str = "SESSION_SECRET";
/// How long a session token stays valid, in minutes. Defaults to [DEFAULT_SESSION_TTL_MINUTES]
pub const SESSION_TTL_MINUTES: &str = "SESSION_TTL_MINUTES";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 720;

/// Where sign-in credentials get checked, see [AuthBackend]
pub const AUTH_BACKEND: &str = "AUTH_BACKEND";
/// Base URL of the hosted auth service. Required when [AUTH_BACKEND] is `hosted`
pub const AUTH_SERVICE_URL: &str = "AUTH_SERVICE_URL";
/// API key sent to the hosted auth service. Required when [AUTH_BACKEND] is `hosted`
pub const AUTH_SERVICE_KEY: &str = "AUTH_SERVICE_KEY";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Source of truth for sign-in credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthBackend {
    /// bcrypt hashes stored in the app_user table
    #[default]
    Database,
    /// A hosted auth service speaking the password grant, see [AUTH_SERVICE_URL]
    Hosted,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("AUTH_BACKEND must be \"database\" or \"hosted\", got \"{0}\"")]
pub struct UnknownAuthBackend(String);

impl FromStr for AuthBackend {
    type Err = UnknownAuthBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "database" | "" => Ok(AuthBackend::Database),
            "hosted" => Ok(AuthBackend::Hosted),
            other => Err(UnknownAuthBackend(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_backend_kinds() {
        assert_eq!(Ok(AuthBackend::Database), "database".parse());
        assert_eq!(Ok(AuthBackend::Hosted), " Hosted ".parse());
        assert_eq!(Ok(AuthBackend::Database), "".parse());
        assert!("ldap".parse::<AuthBackend>().is_err());
    }
}
