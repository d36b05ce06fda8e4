//! Credential handling and outbound URL checks.

pub mod credentials;
pub mod url_validator;

pub use credentials::SecretString;
pub use url_validator::UrlValidator;
