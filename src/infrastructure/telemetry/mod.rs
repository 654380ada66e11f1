//! Tracing Integration
//!
//! Wires `tracing-subscriber` with an environment filter and a fmt
//! layer. Call once at startup from the embedding application; library
//! code only emits events and never installs a subscriber on its own.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard filter directives (e.g. `mktlink=debug`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive applied under the env filter.
const DEFAULT_DIRECTIVE: &str = "mktlink=info";

/// Initialize the global subscriber from the environment.
///
/// # Panics
///
/// Panics when a global subscriber is already installed.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        DEFAULT_DIRECTIVE
            .parse()
            .expect("static directive 'mktlink=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn default_directive_parses() {
        assert!(DEFAULT_DIRECTIVE.parse::<Directive>().is_ok());
    }
}
