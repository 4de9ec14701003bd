use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordHashError {
    #[error("unsupported hash scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed password hash")]
    Malformed,
}

/// Salted SHA-256 password hash, stored as `sha256$<salt-hex>$<digest-hex>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordHash {
    salt: Vec<u8>,
    digest: [u8; 32],
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, salt)
    }

    pub fn with_salt(password: &str, salt: Vec<u8>) -> Self {
        let digest = digest(&salt, password);
        Self { salt, digest }
    }

    /// Fixed hash compared against when the account does not exist, so a
    /// miss does the same work as a wrong password.
    pub fn dummy() -> Self {
        Self {
            salt: vec![0u8; SALT_LEN],
            digest: [0u8; 32],
        }
    }

    pub fn parse(encoded: &str) -> Result<Self, PasswordHashError> {
        let mut parts = encoded.split('$');
        let scheme = parts.next().unwrap_or_default();
        if scheme != SCHEME {
            return Err(PasswordHashError::UnsupportedScheme(scheme.to_string()));
        }
        let (Some(salt), Some(digest), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(PasswordHashError::Malformed);
        };
        let salt = hex::decode(salt).map_err(|_| PasswordHashError::Malformed)?;
        let digest: [u8; 32] = hex::decode(digest)
            .map_err(|_| PasswordHashError::Malformed)?
            .try_into()
            .map_err(|_| PasswordHashError::Malformed)?;
        Ok(Self { salt, digest })
    }

    pub fn encode(&self) -> String {
        format!("{SCHEME}${}${}", hex::encode(&self.salt), hex::encode(self.digest))
    }

    /// Constant-time comparison of the candidate's digest with the stored one.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        candidate[..].ct_eq(&self.digest[..]).unwrap_u8() == 1
    }
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_verify_accepts_matching_password() {
        let hash = PasswordHash::generate("correct horse");
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("correct horse "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_encoded_form_parses_back() {
        let hash = PasswordHash::with_salt("pw", vec![1, 2, 3, 4]);
        let encoded = hash.encode();
        assert!(encoded.starts_with("sha256$01020304$"));
        let parsed = PasswordHash::parse(&encoded).unwrap();
        assert!(parsed.verify("pw"));
    }

    #[test]
    fn test_generated_salts_differ() {
        let a = PasswordHash::generate("same");
        let b = PasswordHash::generate("same");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_dummy_rejects_everything() {
        let dummy = PasswordHash::dummy();
        assert!(!dummy.verify(""));
        assert!(!dummy.verify("anything"));
    }

    #[rstest]
    #[case("bcrypt$aa$bb", PasswordHashError::UnsupportedScheme("bcrypt".into()))]
    #[case("plaintext", PasswordHashError::UnsupportedScheme("plaintext".into()))]
    #[case("sha256$zz$00", PasswordHashError::Malformed)]
    #[case("sha256$00$0011", PasswordHashError::Malformed)]
    #[case("sha256$00", PasswordHashError::Malformed)]
    #[case("sha256$00$00$00", PasswordHashError::Malformed)]
    fn test_parse_rejects(#[case] encoded: &str, #[case] expected: PasswordHashError) {
        assert_eq!(PasswordHash::parse(encoded).unwrap_err(), expected);
    }
}
