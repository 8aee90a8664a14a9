//! Deployment configuration and the server recovery secret.

pub mod secret;
pub mod settings;

pub use secret::ServerSecret;
pub use settings::Settings;
