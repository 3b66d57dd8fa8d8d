//! Revision-history fingerprinting.
//!
//! The cache key for remapped and decompiled artifacts is derived from the
//! identifiers of the commits that last touched the mapping files, not from
//! the files' bytes. The same history always yields the same key, on any
//! machine.

use std::fmt;

use sha2::{Digest, Sha256};

/// Number of trailing hex characters used as the cache-key segment.
pub const KEY_LEN: usize = 8;

/// Ordered revision identifiers, newest first.
///
/// Order is significant: the same identifiers in a different order produce a
/// different [`Fingerprint`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionSet(Vec<String>);

impl RevisionSet {
    /// Wraps an already-ordered list of revision identifiers.
    pub fn new(revisions: Vec<String>) -> Self {
        Self(revisions)
    }

    /// Returns the identifiers in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of identifiers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no revisions were found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RevisionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// SHA-256 digest of a [`RevisionSet`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Returns the full digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the cache-key segment: the last [`KEY_LEN`] hex characters.
    pub fn key(&self) -> String {
        let full = self.to_hex();
        full[full.len() - KEY_LEN..].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.key())
    }
}

/// Computes fingerprints from revision histories.
pub struct ContentHasher;

impl ContentHasher {
    /// Feeds every identifier, in order, into SHA-256.
    ///
    /// Each identifier is preceded by its byte length as a little-endian
    /// `u64`, so shifting bytes across an identifier boundary changes the
    /// fingerprint.
    ///
    /// An empty set is valid and yields the digest of no input, a fixed
    /// "no history" fingerprint. This is a pure function; callers that treat
    /// missing history as suspicious report it themselves.
    pub fn fingerprint(revisions: &RevisionSet) -> Fingerprint {
        let mut hasher = Sha256::new();
        for rev in revisions.as_slice() {
            hasher.update((rev.len() as u64).to_le_bytes());
            hasher.update(rev.as_bytes());
        }
        Fingerprint(hasher.finalize().into())
    }
}
