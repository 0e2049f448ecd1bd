//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for credentials such as the gateway
//! bot token. `SecretString` implements `Debug` with redaction, so a config
//! struct that derives or hand-writes `Debug` never leaks the token through
//! `{:?}` or a tracing field.
//!
//! Values are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct GatewayCredentials {
//!     application: String,
//!     bot_token: SecretString,
//! }
//!
//! let creds = GatewayCredentials {
//!     application: "vc-lifecycle".to_string(),
//!     bot_token: SecretString::from("MTIz.abc.def"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("MTIz"));
//! assert_eq!(creds.bot_token.expose_secret(), "MTIz.abc.def");
//! ```
//!
//! Use `SecretString` for bot tokens and database URLs that embed credentials.
//! Only call `expose_secret()` at the point the value is handed to the client
//! library that needs it.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let token = SecretString::from("MTIz.bot.token");
        let debug_str = format!("{token:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("MTIz"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let token = SecretString::from("MTIz.bot.token");
        assert_eq!(token.expose_secret(), "MTIz.bot.token");
    }

    #[test]
    fn test_deserialize_keeps_value_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct BotSettings {
            guild: String,
            token: SecretString,
        }

        let json = r#"{"guild": "home", "token": "gateway-secret"}"#;
        let settings: BotSettings = serde_json::from_str(json).expect("deserialize");

        assert_eq!(settings.token.expose_secret(), "gateway-secret");

        let debug = format!("{settings:?}");
        assert!(debug.contains("home"));
        assert!(!debug.contains("gateway-secret"));
    }
}
