//! Runner domain model
//!
//! Represents an external worker process that executes offloaded jobs
//! outside the main server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    pub id: i64,

    pub name: String,

    pub description: Option<String>,

    /// Per-runner secret, returned once at registration and presented on
    /// every subsequent call.
    pub token: String,

    /// Registration token this runner signed up through
    pub registration_token_id: i64,

    /// Last time this runner called any authenticated endpoint
    pub last_contact: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Shared secret that lets a runner self-register without a pre-provisioned
/// per-runner token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerRegistrationToken {
    pub id: i64,

    pub secret: String,

    pub created_at: DateTime<Utc>,
}
