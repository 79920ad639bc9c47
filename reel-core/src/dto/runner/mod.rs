//! Runner DTOs
//!
//! Data transfer objects for runner registration and management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::runner::{Runner, RunnerRegistrationToken};

/// Request to register a runner against a registration token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRunnerRequest {
    pub registration_token: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Result of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRunnerResult {
    pub id: i64,

    /// The per-runner secret to present on every subsequent call.
    pub runner_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterRunnerRequest {
    pub runner_token: String,
}

/// Admin-facing runner listing entry. Deliberately omits the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub last_contact: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Runner> for RunnerSummary {
    fn from(runner: Runner) -> Self {
        RunnerSummary {
            id: runner.id,
            name: runner.name,
            description: runner.description,
            last_contact: runner.last_contact,
            created_at: runner.created_at,
        }
    }
}

/// Admin-facing registration token listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationTokenSummary {
    pub id: i64,
    pub secret: String,
    pub created_at: DateTime<Utc>,
    /// Number of runners currently registered through this token
    pub registered_runners_count: i64,
}

impl RegistrationTokenSummary {
    pub fn from_token(token: RunnerRegistrationToken, registered_runners_count: i64) -> Self {
        RegistrationTokenSummary {
            id: token.id,
            secret: token.secret,
            created_at: token.created_at,
            registered_runners_count,
        }
    }
}
