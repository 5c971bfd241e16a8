//! Shared blocking HTTP plumbing for the provider clients: agent
//! construction plus retry with transient/permanent classification.

use std::time::Duration;

use tracing::{debug, warn};

use crate::IndexerError;

pub(crate) const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

enum Classified {
    /// Rate limits, server errors, and transport failures. Worth retrying.
    Transient(String),
    /// Client-side failures such as bad credentials or a malformed request.
    Permanent(String),
}

fn classify(error: &ureq::Error) -> Classified {
    match error {
        ureq::Error::StatusCode(status) => {
            if *status == 429 || *status >= 500 {
                Classified::Transient(format!("HTTP {status}"))
            } else {
                Classified::Permanent(format!("HTTP {status}"))
            }
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => Classified::Transient(error.to_string()),
        _ => Classified::Permanent(error.to_string()),
    }
}

/// Runs a blocking request closure, retrying transient failures with
/// exponential backoff. Permanent failures are returned on first sight.
pub(crate) fn request_with_retry<F>(
    attempts: u32,
    mut request_fn: F,
) -> Result<String, IndexerError>
where
    F: FnMut() -> Result<String, ureq::Error>,
{
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        debug!("HTTP request attempt {}/{}", attempt, attempts);

        match request_fn() {
            Ok(response_text) => {
                debug!("Request succeeded on attempt {}", attempt);
                return Ok(response_text);
            }
            Err(error) => match classify(&error) {
                Classified::Permanent(reason) => {
                    warn!("Non-retryable provider error: {}", reason);
                    return Err(IndexerError::PermanentProvider(reason));
                }
                Classified::Transient(reason) => {
                    warn!(
                        "Transient provider error: {}, attempt {}/{}",
                        reason, attempt, attempts
                    );
                    last_error = reason;

                    if attempt < attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            },
        }
    }

    Err(IndexerError::TransientProvider(format!(
        "request failed after {attempts} attempts: {last_error}"
    )))
}
