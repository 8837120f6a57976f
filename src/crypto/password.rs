//! Password hashing.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.
//! The iteration count travels with the hash so it can be raised later
//! without invalidating existing accounts.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::CryptoError;

const SCHEME: &str = "pbkdf2-sha256";
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 100_000;
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        B64.encode(salt),
        B64.encode(hash)
    )
}

/// Check a password against a stored hash in constant time.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored value
/// is not a hash this module produced.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 {
        return Err(CryptoError::MalformedHash);
    }
    let salt = B64.decode(salt).map_err(|_| CryptoError::MalformedHash)?;
    let expected = B64.decode(expected).map_err(|_| CryptoError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    Ok(actual[..].ct_eq(&expected[..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_password("doctorPassword123");
        assert!(verify_password("doctorPassword123", &stored).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let stored = hash_password("doctorPassword123");
        assert!(!verify_password("doctorPassword124", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("secret"), hash_password("secret"));
    }

    #[test]
    fn stored_form_carries_scheme_and_iterations() {
        let stored = hash_password("secret");
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], SCHEME);
        assert_eq!(parts[1], PBKDF2_ITERATIONS.to_string());
    }

    #[test]
    fn hash_with_other_iteration_count_still_verifies() {
        let salt = [7u8; SALT_LENGTH];
        let hash = derive("secret", &salt, 10);
        let stored = format!("{SCHEME}$10${}${}", B64.encode(salt), B64.encode(hash));
        assert!(verify_password("secret", &stored).unwrap());
    }

    #[test]
    fn malformed_hashes_error() {
        for bad in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$notanumber$AAAA$AAAA",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "pbkdf2-sha256$10$!!!$AAAA",
            "pbkdf2-sha256$10$AAAA$AAAA",
            "pbkdf2-sha256$10$AAAA$AAAA$extra",
        ] {
            assert!(
                matches!(verify_password("x", bad), Err(CryptoError::MalformedHash)),
                "accepted {bad:?}"
            );
        }
    }
}
