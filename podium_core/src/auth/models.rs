use serde::{Deserialize, Serialize};

/// Claims carried by an ID token issued to a signed-in client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// Claims carried by the session cookie minted from an ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
    pub auth_time: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

impl From<SessionClaims> for VerifiedIdentity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
        }
    }
}
