use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Rules for passwords chosen at registration or admin creation. Existing hashes are not rechecked.
pub fn check_password_policy(password: &str) -> Result<(), &'static str> {
    if password.trim().is_empty() {
        return Err("Password cannot be empty");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Hash a password using Argon2id with a random salt
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(OsRng);
    let password_hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip() {
        let hash = hash_password("caretaker-pass").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("caretaker-pass", &hash).unwrap());
        assert!(!verify_password("Caretaker-pass", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        assert_ne!(hash_password("same_password").unwrap(), hash_password("same_password").unwrap());
    }

    #[test]
    fn test_corrupt_stored_hash_is_an_error() {
        assert!(verify_password("anything", "not_a_valid_hash").is_err());
    }

    #[test]
    fn test_non_ascii_password() {
        let hash = hash_password("nyumba🔑kodi").unwrap();
        assert!(verify_password("nyumba🔑kodi", &hash).unwrap());
    }

    #[test]
    fn test_password_policy() {
        assert_eq!(check_password_policy("   "), Err("Password cannot be empty"));
        assert_eq!(check_password_policy("short"), Err("Password must be at least 8 characters"));
        assert!(check_password_policy("long enough").is_ok());
        // counted in characters, not bytes
        assert!(check_password_policy("ñññññññ").is_err());
    }
}
