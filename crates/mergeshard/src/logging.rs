//! Structured logging setup on `tracing-subscriber`.

use mergeshard_error::{Result, ShardError};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "MERGESHARD_LOG";

pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber with the given `EnvFilter` directives.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case that one stays in place.
pub fn init(directives: &str) -> Result<bool> {
    let filter = EnvFilter::try_new(directives).map_err(|e| {
        ShardError::configuration(format!("invalid log filter {directives:?}: {e}"))
    })?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

/// [`init`] with the directives from `MERGESHARD_LOG`, or `info`.
pub fn init_from_env() -> Result<bool> {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_owned());
    init(&directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_first_subscriber() {
        // The first call may lose to another test; the second always does.
        let _ = init("mergeshard=debug").unwrap();
        assert!(!init("warn").unwrap());
    }

    #[test]
    fn bad_directive_is_configuration_error() {
        let err = init("report=loud").unwrap_err();
        assert!(matches!(err, ShardError::Configuration { .. }));
    }
}
