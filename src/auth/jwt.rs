/// Token Issuer
///
/// Signs and verifies access and refresh tokens. The two kinds use separate
/// HMAC secrets, so an access token never verifies as a refresh token and
/// vice versa.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AccessRejection, AppError, ConfigError, RefreshRejection};
use crate::store::UserIdentity;

/// A freshly minted pair. Not persisted by the issuer.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime as configured, e.g. "15m"
    pub access_token_ttl: String,
    pub access_token_expires_in: i64,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

pub struct TokenIssuer {
    access: SigningKey,
    refresh: SigningKey,
    access_ttl_label: String,
    issuer: String,
    validation: Validation,
}

impl TokenIssuer {
    /// Build the issuer from settings. Called once at startup; any error here
    /// is fatal.
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, ConfigError> {
        let access_secret = required_secret("jwt.access_secret (JWT_SECRET)", &settings.access_secret)?;
        let refresh_secret = required_secret(
            "jwt.refresh_secret (JWT_REFRESH_SECRET)",
            &settings.refresh_secret,
        )?;
        if access_secret == refresh_secret {
            return Err(ConfigError::InvalidValue(
                "access and refresh secrets must differ".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: no grace period past `exp`
        validation.leeway = 0;
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Ok(Self {
            access: SigningKey::new(access_secret, settings.access_ttl()?),
            refresh: SigningKey::new(refresh_secret, settings.refresh_ttl()?),
            access_ttl_label: settings.access_token_ttl.trim().to_string(),
            issuer: settings.issuer.clone(),
            validation,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }

    /// Mint an access/refresh pair for the user.
    pub fn issue(&self, identity: &UserIdentity) -> Result<TokenPair, AppError> {
        let access_claims = Claims::new(identity, self.access.ttl, &self.issuer);
        let refresh_claims = Claims::new(identity, self.refresh.ttl, &self.issuer);

        Ok(TokenPair {
            access_token: self.sign(&access_claims, &self.access)?,
            refresh_token: self.sign(&refresh_claims, &self.refresh)?,
            access_token_ttl: self.access_ttl_label.clone(),
            access_token_expires_in: self.access.ttl.as_secs() as i64,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AccessRejection> {
        self.verify(token, &self.access).map_err(|kind| match kind {
            ErrorKind::ExpiredSignature => AccessRejection::Expired,
            _ => AccessRejection::Invalid,
        })
    }

    /// Signature, expiry and issuer check against the refresh secret only.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, RefreshRejection> {
        self.verify(token, &self.refresh).map_err(|kind| match kind {
            ErrorKind::ExpiredSignature => RefreshRejection::Expired,
            ErrorKind::InvalidSignature => RefreshRejection::BadSignature,
            _ => RefreshRejection::Malformed,
        })
    }

    fn sign(&self, claims: &Claims, key: &SigningKey) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &key.encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn verify(&self, token: &str, key: &SigningKey) -> Result<Claims, ErrorKind> {
        decode::<Claims>(token, &key.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| e.into_kind())
    }
}

fn required_secret<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(ConfigError::MissingRequired(name.to_string())),
    }
}
