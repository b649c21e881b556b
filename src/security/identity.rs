//! Bearer credential verification.
//!
//! # Responsibilities
//! - Extract the credential from an `Authorization: Bearer` header
//! - Verify the HS256 signature against the configured secret
//! - Enforce expiry (rejected at or after `exp`)
//! - Emit a security event on every rejection, with a truncated excerpt only
//!
//! # Design Decisions
//! - Signature verification and expiry checks are separate so the two
//!   failures are reported distinctly
//! - The verifier never issues credentials; see `issuer.rs`

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::metrics;

/// Longest credential prefix ever written to a log.
const EXCERPT_MAX_CHARS: usize = 20;

/// A verified principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub principal_name: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Claims carried inside a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            principal_name: claims.username,
            role: claims.role,
        }
    }
}

/// Why a credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing credential")]
    MissingCredential,
    #[error("malformed credential")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("credential expired")]
    Expired,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingCredential => "missing",
            RejectReason::Malformed => "malformed",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::Expired => "expired",
        }
    }
}

/// Validates bearer credentials and produces identities.
#[derive(Clone)]
pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify the value of an `Authorization` header.
    pub fn verify(&self, authorization: Option<&str>, origin: &str) -> Result<Identity, RejectReason> {
        self.verify_at(authorization, origin, Utc::now())
    }

    /// Verify against an explicit clock reading.
    pub fn verify_at(
        &self,
        authorization: Option<&str>,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, RejectReason> {
        let token = match bearer_token(authorization) {
            Ok(token) => token,
            Err(reason) => {
                report_rejection(reason, authorization.unwrap_or_default(), origin);
                return Err(reason);
            }
        };

        match self.check(token, now) {
            Ok(identity) => Ok(identity),
            Err(reason) => {
                report_rejection(reason, token, origin);
                Err(reason)
            }
        }
    }

    fn check(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, RejectReason> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => RejectReason::InvalidSignature,
            _ => RejectReason::Malformed,
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(RejectReason::Expired);
        }

        Ok(data.claims.into())
    }
}

/// Pull the token out of `Bearer <token>`.
fn bearer_token(authorization: Option<&str>) -> Result<&str, RejectReason> {
    let value = authorization.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(RejectReason::MissingCredential);
    }

    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().map(str::trim).unwrap_or_default();

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(RejectReason::Malformed);
    }
    if token.is_empty() {
        return Err(RejectReason::MissingCredential);
    }
    Ok(token)
}

/// A log-safe prefix of a credential: never the whole thing.
pub fn credential_excerpt(credential: &str) -> String {
    let total = credential.chars().count();
    let keep = EXCERPT_MAX_CHARS.min(total / 2);
    let prefix: String = credential.chars().take(keep).collect();
    format!("{prefix}...")
}

fn report_rejection(reason: RejectReason, credential: &str, origin: &str) {
    metrics::record_auth_rejection(reason.as_str());
    if reason == RejectReason::MissingCredential {
        tracing::debug!(target: "security", origin = %origin, reason = reason.as_str(), "Request without credential");
        return;
    }
    tracing::warn!(
        target: "security",
        origin = %origin,
        reason = reason.as_str(),
        credential = %credential_excerpt(credential),
        "Invalid token attempt"
    );
}
