//! Key-wrapping access control.
//!
//! This module provides:
//! - The password length policy (`policy`)
//! - First-time provisioning of the master key (`provision`)
//! - Server-secret recovery of a lost password (`recovery`)
//! - Per-session custody of the unwrapped key (`custodian`)
//! - Encryption of individual field values under that key (`field`)

pub mod custodian;
pub mod field;
pub mod policy;
pub mod provision;
pub mod recovery;

pub use custodian::{CustodyState, SessionCustodian};
pub use field::{FieldCipher, FieldValue};
pub use policy::PasswordPolicy;
pub use provision::Provisioner;
pub use recovery::RecoveryService;
