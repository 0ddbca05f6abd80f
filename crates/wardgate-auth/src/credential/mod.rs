//! Credential verification per realm, realm routing, and failure tracking.

pub mod failures;
pub mod router;
pub mod verifier;

pub use failures::{FailureKey, FailureTracker};
pub use router::{AuthAttempt, RealmRouter};
pub use verifier::{
    AdminVerifier, AppVerifier, AuthFailure, CredentialVerifier, Realm, Verification,
};
