//! Boundary contracts for the setup, recovery and status endpoints.
//!
//! `KeyService` is what an HTTP layer calls once its own identity checks
//! have passed.  It turns each operation into an `ApiResponse`: a status
//! code plus a JSON-ready body.  Routing and authentication stay outside
//! this crate.
//!
//! | operation | success              | failures                                  |
//! |-----------|----------------------|-------------------------------------------|
//! | status    | 200 `{isSetup}`      | 500 store                                 |
//! | setup     | 200 `{success:true}` | 400 weak, 409 already set up, 500 other  |
//! | recover   | 200 `{success:true}` | 400 weak, 404 not set up, 500 other      |

use serde::{Deserialize, Serialize};
use tracing::error;
use zeroize::Zeroizing;

use crate::access::{PasswordPolicy, Provisioner, RecoveryService};
use crate::audit::AuditSink;
use crate::config::{ServerSecret, Settings};
use crate::crypto::WrapCipher;
use crate::errors::{CompVaultError, ErrorKind, Result};
use crate::record::KeyRecordStore;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST setup`. Not `Debug`, so the password cannot end up in logs.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub password: Zeroizing<String>,
}

/// Body of `POST recover`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRequest {
    pub new_password: Zeroizing<String>,
}

/// JSON body of every endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiBody {
    #[serde(rename_all = "camelCase")]
    Status { is_setup: bool },
    Success { success: bool },
    Error { error: String },
}

/// Status code plus body, ready to hand to whatever HTTP stack is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ApiBody,
}

impl ApiResponse {
    fn ok(body: ApiBody) -> Self {
        Self { status: 200, body }
    }

    fn success() -> Self {
        Self::ok(ApiBody::Success { success: true })
    }

    fn failure(err: &CompVaultError, not_setup_status: u16) -> Self {
        let status = match err.kind() {
            ErrorKind::WeakInput => 400,
            ErrorKind::NotSetup => not_setup_status,
            ErrorKind::AlreadySetup => 409,
            _ => 500,
        };
        Self {
            status,
            body: ApiBody::Error {
                error: err.public_message(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Serialize the body as the endpoint would send it.
    pub fn body_json(&self) -> Result<String> {
        serde_json::to_string(&self.body)
            .map_err(|e| CompVaultError::Serialization(format!("response body: {e}")))
    }
}

// ---------------------------------------------------------------------------
// KeyService
// ---------------------------------------------------------------------------

/// The three key-record endpoints for one protection domain.
pub struct KeyService<S: KeyRecordStore> {
    store: S,
    cipher: WrapCipher,
    policy: PasswordPolicy,
    verify_on_setup: bool,
    secret: Option<ServerSecret>,
    audit: Option<Box<dyn AuditSink>>,
}

impl<S: KeyRecordStore> KeyService<S> {
    /// Build a service from settings.
    ///
    /// `secret` may be `None`; status keeps working, while setup and
    /// recovery fail with a configuration error.
    pub fn new(store: S, settings: &Settings, secret: Option<ServerSecret>) -> Result<Self> {
        Ok(Self {
            store,
            cipher: WrapCipher::new(settings.argon2_params())?,
            policy: settings.password_policy(),
            verify_on_setup: settings.verify_on_setup,
            secret,
            audit: None,
        })
    }

    /// Record every setup and recovery attempt in `sink`.
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cipher(&self) -> &WrapCipher {
        &self.cipher
    }

    /// `GET status`.
    pub fn status(&self) -> ApiResponse {
        match self.store.get() {
            Ok(record) => ApiResponse::ok(ApiBody::Status {
                is_setup: record.is_some_and(|r| r.is_setup()),
            }),
            Err(e) => {
                error!(domain = %self.store.domain(), error = %e, "status lookup failed");
                ApiResponse::failure(&e, 500)
            }
        }
    }

    /// `POST setup`.
    pub fn setup(&self, request: &SetupRequest) -> ApiResponse {
        let result = self
            .secret()
            .and_then(|secret| self.provisioner(secret).setup(&request.password));
        self.respond("setup", result, 500)
    }

    /// Setup that replaces an existing record with a new master key.
    ///
    /// Operator-only, never routed as an endpoint: every value protected
    /// under the previous key becomes unreadable.
    pub fn reprovision(&self, request: &SetupRequest) -> ApiResponse {
        let result = self
            .secret()
            .and_then(|secret| self.provisioner(secret).reprovision(&request.password));
        self.respond("reprovision", result, 500)
    }

    /// `POST recover`.
    pub fn recover(&self, request: &RecoverRequest) -> ApiResponse {
        let result = self.secret().and_then(|secret| {
            RecoveryService::new(&self.store, self.cipher, secret)
                .with_policy(self.policy)
                .recover(&request.new_password)
        });
        self.respond("recover", result, 404)
    }

    fn provisioner<'a>(&'a self, secret: &'a ServerSecret) -> Provisioner<'a, S> {
        Provisioner::new(&self.store, self.cipher, secret)
            .with_policy(self.policy)
            .verify_on_setup(self.verify_on_setup)
    }

    fn secret(&self) -> Result<&ServerSecret> {
        self.secret.as_ref().ok_or_else(|| {
            CompVaultError::Configuration("server recovery secret is not configured".into())
        })
    }

    fn respond(&self, operation: &str, result: Result<()>, not_setup_status: u16) -> ApiResponse {
        if let Some(audit) = &self.audit {
            audit.record(operation, self.store.domain(), &result);
        }

        match result {
            Ok(()) => ApiResponse::success(),
            Err(e) => {
                if matches!(
                    e.kind(),
                    ErrorKind::Store
                        | ErrorKind::Configuration
                        | ErrorKind::DataIntegrity
                        | ErrorKind::Internal
                ) {
                    error!(domain = %self.store.domain(), operation, error = %e, "operation failed");
                }
                ApiResponse::failure(&e, not_setup_status)
            }
        }
    }
}
