//! Session Configuration
//!
//! Builds [`SessionOptions`] from the environment. A `.env` file is
//! loaded best-effort first, then process variables win.
//!
//! # Environment Variables
//!
//! - `MKTLINK_HOST`: session host (default: `127.0.0.1`)
//! - `MKTLINK_PORT`: session port (default: `8194`)

use crate::application::ports::{DEFAULT_HOST, DEFAULT_PORT, SessionOptions};

/// Environment variable naming the session host.
pub const ENV_HOST: &str = "MKTLINK_HOST";

/// Environment variable naming the session port.
pub const ENV_PORT: &str = "MKTLINK_PORT";

/// Load session options from the environment.
#[must_use]
pub fn from_env() -> SessionOptions {
    // Missing .env is the normal case, not an error.
    let _ = dotenvy::dotenv();

    options_from(std::env::var(ENV_HOST).ok(), std::env::var(ENV_PORT).ok())
}

fn options_from(host: Option<String>, port: Option<String>) -> SessionOptions {
    let host = host
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_owned());
    let port = port
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    SessionOptions { host, port }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let options = options_from(None, None);
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
    }

    #[test]
    fn explicit_values_win() {
        let options = options_from(
            Some("feed.example.com".to_owned()),
            Some("9001".to_owned()),
        );
        assert_eq!(options.host, "feed.example.com");
        assert_eq!(options.port, 9001);
    }

    #[test]
    fn empty_host_and_bad_port_fall_back() {
        let options = options_from(Some(String::new()), Some("not-a-port".to_owned()));
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
    }
}
