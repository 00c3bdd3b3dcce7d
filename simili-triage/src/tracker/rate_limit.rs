//! GitHub API rate limit checks.
//!
//! Each identity has its own budget, so checks run against the client that
//! is about to make the call.

use chrono::Utc;
use octocrab::Octocrab;
use std::time::Duration;
use tracing::{info, warn};

/// Maximum time to wait for a rate limit reset (1 hour).
const MAX_WAIT_SECS: u64 = 3600;

/// Minimum remaining requests before proactively waiting.
const MIN_REMAINING_THRESHOLD: u32 = 5;

/// Rate limit budget of one API resource.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,

    /// Unix timestamp when the window resets.
    pub reset: u64,

    /// Total requests allowed per window.
    pub limit: u32,
}

impl From<&octocrab::models::Rate> for RateLimitInfo {
    fn from(rate: &octocrab::models::Rate) -> Self {
        Self {
            remaining: u32::try_from(rate.remaining).unwrap_or(u32::MAX),
            reset: rate.reset,
            limit: u32::try_from(rate.limit).unwrap_or(u32::MAX),
        }
    }
}

/// Checks the REST (core) budget.
///
/// # Errors
///
/// Returns an error if the rate limit API call fails.
pub async fn check_core_rate_limit(octocrab: &Octocrab) -> Result<RateLimitInfo, octocrab::Error> {
    let rate_limit = octocrab.ratelimit().get().await?;
    Ok(RateLimitInfo::from(&rate_limit.resources.core))
}

/// Checks the GraphQL budget, falling back to core when GitHub omits it.
///
/// # Errors
///
/// Returns an error if the rate limit API call fails.
pub async fn check_graphql_rate_limit(
    octocrab: &Octocrab,
) -> Result<RateLimitInfo, octocrab::Error> {
    let rate_limit = octocrab.ratelimit().get().await?;
    let rate = rate_limit
        .resources
        .graphql
        .as_ref()
        .unwrap_or(&rate_limit.resources.core);
    Ok(RateLimitInfo::from(rate))
}

/// Waits if the budget is low, returning true if we waited.
///
/// # Arguments
///
/// * `info` - Current rate limit information
pub async fn wait_if_needed(info: &RateLimitInfo) -> bool {
    if info.remaining >= MIN_REMAINING_THRESHOLD {
        return false;
    }

    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    if info.reset <= now {
        return false;
    }

    let wait_secs = info.reset - now;
    if wait_secs > MAX_WAIT_SECS {
        warn!(
            wait_secs,
            max_wait = MAX_WAIT_SECS,
            "Rate limit reset too far in future, capping wait time"
        );
    }

    let actual_wait = wait_secs.min(MAX_WAIT_SECS);
    info!(
        remaining = info.remaining,
        wait_secs = actual_wait,
        "Rate limit low, waiting for reset"
    );

    tokio::time::sleep(Duration::from_secs(actual_wait)).await;
    true
}

/// Ensures sufficient core budget before REST calls.
///
/// # Errors
///
/// Returns an error if the rate limit check fails.
pub async fn ensure_core_rate_limit(octocrab: &Octocrab) -> Result<(), octocrab::Error> {
    let info = check_core_rate_limit(octocrab).await?;
    wait_if_needed(&info).await;
    Ok(())
}

/// Ensures sufficient GraphQL budget before the transfer mutation.
///
/// # Errors
///
/// Returns an error if the rate limit check fails.
pub async fn ensure_graphql_rate_limit(octocrab: &Octocrab) -> Result<(), octocrab::Error> {
    let info = check_graphql_rate_limit(octocrab).await?;
    wait_if_needed(&info).await;
    Ok(())
}
