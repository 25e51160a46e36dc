//! Domain-focused API endpoint modules.

mod health;
mod run;

use serde::Serialize;

/// Structured rejection body for authorization/not-found/unavailable failures.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub use health::health;
pub use run::run;
