//! Demo login collaborator.
//!
//! Issues signed credentials for the accounts listed in `auth.users`. This
//! sits outside the verification pipeline; the verifier only ever checks
//! what this module signs.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use thiserror::Error;

use crate::config::UserAccount;
use crate::security::identity::{Claims, Identity};

/// Ten years; longer lifetimes are clamped.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Errors from the login collaborator.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Signs credentials for configured accounts.
pub struct CredentialIssuer {
    key: EncodingKey,
    ttl: Duration,
    accounts: Vec<UserAccount>,
}

impl CredentialIssuer {
    pub fn new(secret: &str, ttl_secs: u64, accounts: Vec<UserAccount>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            accounts,
        }
    }

    /// Check a username/password pair and issue a credential.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedCredential, IssueError> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.username == username && a.password == password)
            .ok_or(IssueError::InvalidCredentials)?;

        let identity = Identity {
            id: account.id.clone(),
            principal_name: account.username.clone(),
            role: account.role.clone(),
        };

        let now = Utc::now();
        let token = self.issue_at(&identity, now, self.ttl)?;
        Ok(IssuedCredential {
            token,
            identity,
            expires_at: now + self.ttl,
        })
    }

    /// Sign a credential for `identity` valid for `ttl` from `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, IssueError> {
        let claims = Claims {
            id: identity.id.clone(),
            username: identity.principal_name.clone(),
            role: identity.role.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.key)?)
    }
}
