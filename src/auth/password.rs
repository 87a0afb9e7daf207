/// Password Hashing and Verification
///
/// bcrypt with a configurable cost. bcrypt's own `verify` compares digests in
/// constant time. The async variants run on the blocking pool so that hashing
/// does not stall the request executor.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt ignores input past 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if the password is out of bounds or hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    validate_password_length(password)?;

    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash is not a valid bcrypt string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost)).await?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "admin123";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("admin123", TEST_COST).unwrap();
        let b = hash_password("admin123", TEST_COST).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("admin123", TEST_COST).unwrap();

        assert!(verify_password("admin123", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_verify_against_garbage_hash_errors() {
        assert!(verify_password("admin123", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_length_bounds() {
        assert!(hash_password("short", TEST_COST).is_err());
        assert!(hash_password(&"a".repeat(MAX_PASSWORD_LENGTH + 1), TEST_COST).is_err());
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hash = hash_password_blocking("admin123".to_string(), TEST_COST)
            .await
            .unwrap();

        assert!(verify_password_blocking("admin123".to_string(), hash)
            .await
            .unwrap());
    }
}
