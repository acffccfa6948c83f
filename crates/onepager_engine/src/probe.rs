use std::future::Future;

use onepager_logging::{wizard_debug, wizard_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::FetchError;

/// How one candidate answered.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    /// Final answer from the service; the remaining candidates are skipped.
    Authoritative(String),
    /// Transient failure; move on to the next candidate.
    Retry(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("cancelled")]
    Cancelled,
    #[error("{message}")]
    Authoritative { message: String },
    #[error("all {attempts} candidates failed")]
    Exhausted { attempts: usize },
}

/// Try `candidates` in order until one succeeds or answers authoritatively.
///
/// Cancellation is checked before every attempt and raced against each one,
/// so a cancelled probe never reports a late success.
pub async fn probe_candidates<T, F, Fut>(
    candidates: &[String],
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, ProbeError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempts = 0;
    for candidate in candidates {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            outcome = attempt(candidate.clone()) => outcome,
        };
        match outcome {
            Attempt::Success(value) => {
                wizard_debug!("{} answered after {} attempt(s)", candidate, attempts);
                return Ok(value);
            }
            Attempt::Authoritative(message) => {
                wizard_warn!("{} rejected the request: {}", candidate, message);
                return Err(ProbeError::Authoritative { message });
            }
            Attempt::Retry(err) => {
                wizard_debug!("{} failed: {}", candidate, err);
            }
        }
    }
    Err(ProbeError::Exhausted { attempts })
}
