pub mod identity;
pub mod models;

pub use identity::{IdentityProvider, JwtIdentityProvider, SharedIdentityProvider};
pub use models::{IdTokenClaims, SessionClaims, VerifiedIdentity};
