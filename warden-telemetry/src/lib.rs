//! Observability setup for embedding applications.

#![warn(missing_docs, clippy::pedantic)]

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber, honouring `RUST_LOG` and
/// defaulting to `info`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed; use [`try_init`] when
/// that is a legitimate possibility.
pub fn init() {
    try_init().expect("tracing subscriber already installed");
}

/// Installs the global tracing subscriber, returning an error instead of
/// panicking when one is already installed.
///
/// # Errors
///
/// Propagates the subscriber library's initialization error.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
    tracing::debug!("telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_init_is_idempotent_enough_for_tests() {
        // First call installs; a second call must error rather than panic.
        let _ = try_init();
        assert!(try_init().is_err());
    }
}
