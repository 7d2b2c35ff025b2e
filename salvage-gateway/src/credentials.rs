//! The credential pool and its round-robin cursor.

use parking_lot::Mutex;
use salvage_core::ConfigError;
use std::fmt;

/// One provider credential.
///
/// The `Debug` impl and [`Credential::suffix`] never reveal more than the
/// last four characters; log lines must use the suffix, never the value.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the Authorization header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// An opaque identifier: the last four characters of the key.
    pub fn suffix(&self) -> &str {
        // Cut on a char boundary; keys are not guaranteed to be ASCII.
        let start = self.0.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
        &self.0[start..]
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(…{})", self.suffix())
    }
}

/// A pool of interchangeable credentials with a shared rotation cursor.
///
/// The cursor is the single piece of shared mutable state in the whole
/// pipeline. Every gateway *attempt* advances it, so concurrent runs spread
/// their rate-limit exposure across the pool.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<Credential>,
    cursor: Mutex<usize>,
}

impl CredentialPool {
    /// Build a pool. Fails fast when no credentials are supplied.
    pub fn new(keys: Vec<String>) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        Ok(Self {
            keys: keys.into_iter().map(Credential::new).collect(),
            cursor: Mutex::new(0),
        })
    }

    /// Advance the cursor and return the next credential with its index.
    pub fn next(&self) -> (usize, &Credential) {
        let mut cursor = self.cursor.lock();
        let index = *cursor % self.keys.len();
        *cursor = cursor.wrapping_add(1);
        (index, &self.keys[index])
    }

    /// Pool size.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(CredentialPool::new(vec![]).is_err());
    }

    #[test]
    fn test_round_robin() {
        let pool = CredentialPool::new(vec!["aaaa1111".into(), "bbbb2222".into()]).unwrap();
        let (i0, k0) = pool.next();
        let (i1, k1) = pool.next();
        let (i2, _) = pool.next();
        assert_eq!((i0, i1, i2), (0, 1, 0));
        assert_eq!(k0.suffix(), "1111");
        assert_eq!(k1.suffix(), "2222");
    }

    #[test]
    fn test_debug_redacts() {
        let cred = Credential::new("sk-super-secret-key-9876");
        let shown = format!("{cred:?}");
        assert!(shown.contains("9876"));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_short_key_suffix() {
        let cred = Credential::new("ab");
        assert_eq!(cred.suffix(), "ab");
    }

    #[test]
    fn test_non_ascii_key_suffix() {
        let cred = Credential::new("a€€");
        assert_eq!(cred.suffix(), "a€€");
        let cred = Credential::new("sk-секрет");
        assert_eq!(cred.suffix(), "крет");
        assert!(format!("{cred:?}").contains("крет"));
    }
}
