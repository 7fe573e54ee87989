//! API Call Layer - one remote operation in, one classified outcome out
//!
//! Status-code triage lives here so every command reports failures with the
//! same wording. On any failure the progress indicator is stopped before the
//! outcome is returned; on success its lifecycle stays with the caller.

use std::future::Future;

use crate::api_client::SdkResult;
use crate::errors::{CliError, LOGIN_HINT};
use crate::output::ProgressIndicator;

/// Status used when the request never produced a response
const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Classified result of one remote call
#[derive(Debug)]
pub enum ApiOutcome<T> {
    Success(T),
    HttpError {
        status: u16,
        message: String,
        source: Option<reqwest::Error>,
    },
    AuthError {
        message: String,
    },
    InputError {
        message: String,
    },
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    /// Convert into a `Result` so commands can bubble failures with `?`
    pub fn into_result(self) -> Result<T, CliError> {
        match self {
            ApiOutcome::Success(data) => Ok(data),
            ApiOutcome::HttpError {
                status,
                message,
                source,
            } => Err(CliError::Http {
                status,
                message,
                source,
            }),
            ApiOutcome::AuthError { message } => Err(CliError::Auth { message }),
            ApiOutcome::InputError { message } => Err(CliError::input(message)),
        }
    }
}

/// Await an in-flight SDK operation and classify its outcome
///
/// `description` names the remote call in failure messages, e.g.
/// `"fetching organizations"`.
pub async fn handle_api_call<T, F>(
    call: F,
    progress: &ProgressIndicator,
    description: &str,
) -> ApiOutcome<T>
where
    F: Future<Output = Result<SdkResult<T>, reqwest::Error>>,
{
    match call.await {
        Ok(SdkResult::Success { data, .. }) => ApiOutcome::Success(data),
        Ok(SdkResult::Error { status, error }) => {
            handle_unsuccessful_api_response(description, status, &error, progress)
        }
        Err(e) => {
            tracing::debug!("Transport failure while {}: {:?}", description, e);
            progress.fail(&format!("Request failed while {}", description));
            ApiOutcome::HttpError {
                status: e
                    .status()
                    .map(|s| s.as_u16())
                    .unwrap_or(TRANSPORT_FAILURE_STATUS),
                message: format!("Request failed while {}", description),
                source: Some(e),
            }
        }
    }
}

/// Map a non-success API response to a typed outcome
pub fn handle_unsuccessful_api_response<T>(
    description: &str,
    status: u16,
    message: &str,
    progress: &ProgressIndicator,
) -> ApiOutcome<T> {
    tracing::debug!("Unsuccessful response while {}: {} {}", description, status, message);

    match status {
        401 | 403 => {
            progress.fail("Authentication failed");
            ApiOutcome::AuthError {
                message: format!(
                    "User must be authenticated while {} ({}): {}",
                    description, message, LOGIN_HINT
                ),
            }
        }
        404 => {
            progress.fail("Not found");
            ApiOutcome::InputError {
                message: format!("Not found while {}: {}", description, message),
            }
        }
        _ => {
            progress.fail(&format!("Failed {}", description));
            ApiOutcome::HttpError {
                status,
                message: format!("Failed {}: {}", description, message),
                source: None,
            }
        }
    }
}
