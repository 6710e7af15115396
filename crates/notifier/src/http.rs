//! Shared HTTP agent construction
//!
//! Every external call goes through a `ureq::Agent` with a global timeout, so
//! a hung endpoint fails the call instead of the whole process.

use std::time::Duration;
use ureq::Agent;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Agent that turns 4xx/5xx responses into `ureq::Error::StatusCode`
pub fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    Agent::new_with_config(config)
}

/// Agent that hands back 4xx/5xx responses so their bodies can be read
pub fn agent_keeping_error_bodies(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}
