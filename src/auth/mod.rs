/// Authentication module
///
/// Credential verification, token issuance, refresh-token rotation and
/// logout, composed by `AuthService`.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh;
mod refresh_token;
mod revocation;
mod service;
mod session;

pub use claims::Claims;
pub use credentials::CredentialVerifier;
pub use jwt::{TokenIssuer, TokenPair};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use refresh::RefreshCoordinator;
pub use refresh_token::{hash_refresh_token, refresh_token_matches};
pub use revocation::{Revocation, RevocationHandler};
pub use service::AuthService;
pub use session::{IssuedSession, MintedSession, SessionMinter};
