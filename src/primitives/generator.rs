//! Generation of opaque transaction identifiers.
//!
//! A transaction id doubles as the csrf token binding a consent decision to the session that
//! started the authorization request, so ids must be unguessable. The provided generator draws
//! from the operating system rng; deterministic implementations only belong in tests.

use base64::URL_SAFE_NO_PAD;
use rand::rngs::OsRng;
use rand::RngCore;

/// Produces opaque identifiers for pending authorization transactions.
///
/// When queried repeatedly the output MUST be indistinguishable from a random function, since a
/// party able to predict another session's transaction id can forge consent decisions for it.
pub trait TransactionId {
    /// Generate one fresh identifier.
    fn generate(&self) -> String;
}

/// Generates identifiers from random bytes, encoded with a url-safe alphabet.
///
/// Every identifier of one generator has the same encoded length. This generator will always
/// succeed.
pub struct RandomIdGenerator {
    len: usize,
}

impl RandomIdGenerator {
    /// Generates identifiers with a specific byte length of entropy.
    pub fn new(length: usize) -> RandomIdGenerator {
        RandomIdGenerator { len: length }
    }
}

impl TransactionId for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut result = vec![0; self.len];
        let mut rng = OsRng;
        rng.try_fill_bytes(result.as_mut_slice())
            .expect("Failed to generate random transaction id");
        base64::encode_config(&result, URL_SAFE_NO_PAD)
    }
}

impl<T: TransactionId + ?Sized> TransactionId for Box<T> {
    fn generate(&self) -> String {
        (**self).generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_url_safe_and_fixed_length() {
        let generator = RandomIdGenerator::new(12);
        let first = generator.generate();
        let second = generator.generate();

        assert_eq!(first.len(), 16);
        assert_eq!(second.len(), 16);
        assert_ne!(first, second);
        assert!(first
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }
}
