//! Token validation against the identity API.

use gatekeep_core::api::{ApiError, IdentityApi};
use gatekeep_core::config::VerificationPolicy;
use gatekeep_core::user::UserProfile;
use gatekeep_core::{GatekeepError, Result};

/// One `account_info` call, folded into a profile or a classified error.
///
/// A response is only a success when `code == 200` and a payload is present.
pub async fn fetch_profile(api: &dyn IdentityApi) -> Result<UserProfile> {
    api.account_info()
        .await
        .map_err(ApiError::into_verification_error)?
        .into_data()
        .map_err(GatekeepError::verification)
}

/// Validates freshly persisted tokens following `policy`.
///
/// Each attempt is preceded by its scheduled delay. Rate limiting ends the
/// sequence immediately; otherwise the last error is returned once the
/// schedule is exhausted.
pub async fn verify_with_policy(
    api: &dyn IdentityApi,
    policy: &VerificationPolicy,
) -> Result<UserProfile> {
    let schedule = policy.schedule();
    let attempts = schedule.len();
    let mut last_error = GatekeepError::verification(None);

    for (attempt, delay) in schedule.into_iter().enumerate() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match fetch_profile(api).await {
            Ok(user) => return Ok(user),
            Err(e) if e.is_rate_limited() => {
                tracing::warn!("[Login] Validation rate limited, giving up");
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(
                    "[Login] Validation attempt {}/{} failed: {}",
                    attempt + 1,
                    attempts,
                    e
                );
                last_error = e;
            }
        }
    }

    Err(last_error)
}
