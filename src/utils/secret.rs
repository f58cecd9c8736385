// src/utils/secret.rs

use std::fmt;

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AppError;

/// The admin secret, kept only as an argon2 PHC string.
#[derive(Clone)]
pub struct AdminSecret {
    phc: String,
}

impl AdminSecret {
    pub fn from_plain(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::InternalServerError(
                "Admin secret must not be empty".to_string(),
            ));
        }
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .to_string();
        Ok(Self { phc })
    }

    /// Exact match, no trimming or case folding. A mismatch is `Ok(false)`;
    /// only a broken hash is an error.
    pub fn matches(&self, candidate: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(&self.phc)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::InternalServerError(e.to_string())),
        }
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_exact() {
        let secret = AdminSecret::from_plain("quizmaster").unwrap();
        assert!(secret.matches("quizmaster").unwrap());
        assert!(!secret.matches("quizmaster ").unwrap());
        assert!(!secret.matches("Quizmaster").unwrap());
        assert!(!secret.matches("").unwrap());
    }

    #[test]
    fn test_plain_text_is_not_kept() {
        let secret = AdminSecret::from_plain("quizmaster").unwrap();
        assert!(secret.phc.starts_with("$argon2"));
        assert!(!secret.phc.contains("quizmaster"));
        assert_eq!(format!("{:?}", secret), "AdminSecret(..)");
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(AdminSecret::from_plain("").is_err());
    }
}
