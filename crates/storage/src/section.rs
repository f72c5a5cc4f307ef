//! Storage-layer section value
//!
//! The contract type `Versioned<T>` carries no expiration because
//! expiration is a storage concern. `StoredSection` combines the
//! published payload with its version stamp and the optional absolute
//! expiration time the writer supplied at section creation.
//!
//! A `StoredSection` is immutable once constructed: publication replaces
//! the whole `Arc<StoredSection>` in the section map rather than mutating
//! in place. That swap is the atomicity mechanism readers rely on.

use syncpoint_core::{Timestamp, Version, Versioned};

/// An immutable published section payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSection {
    /// Full payload bytes as committed
    payload: Vec<u8>,
    /// Version of the commit that published this payload
    version: Version,
    /// Completion time of that commit
    timestamp: Timestamp,
    /// Absolute expiration time, if the section expires
    expiration: Option<Timestamp>,
}

impl StoredSection {
    /// Create a published section value
    pub fn new(
        payload: Vec<u8>,
        version: Version,
        timestamp: Timestamp,
        expiration: Option<Timestamp>,
    ) -> Self {
        StoredSection {
            payload,
            version,
            timestamp,
            expiration,
        }
    }

    /// The payload bytes
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Version of the commit that published this payload
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Completion time of that commit
    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The absolute expiration time, if any
    #[inline]
    pub fn expiration(&self) -> Option<Timestamp> {
        self.expiration
    }

    /// Whether the section is expired as of `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expiration {
            Some(at) => now >= at,
            None => false,
        }
    }

    /// Copy out the payload with its version information
    pub fn versioned(&self) -> Versioned<Vec<u8>> {
        Versioned::with_timestamp(self.payload.clone(), self.version, self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_accessors() {
        let s = StoredSection::new(
            b"hello".to_vec(),
            Version::new(2),
            Timestamp::from_secs(10),
            None,
        );
        assert_eq!(s.payload(), b"hello");
        assert_eq!(s.len(), 5);
        assert!(!s.is_empty());
        assert_eq!(s.version(), Version::new(2));
        assert_eq!(s.timestamp(), Timestamp::from_secs(10));
        assert_eq!(s.expiration(), None);
    }

    #[test]
    fn test_section_never_expires_without_expiration() {
        let s = StoredSection::new(vec![], Version::new(1), Timestamp::EPOCH, None);
        assert!(!s.is_expired(Timestamp::MAX));
    }

    #[test]
    fn test_section_expiry_boundary() {
        let s = StoredSection::new(
            vec![1],
            Version::new(1),
            Timestamp::EPOCH,
            Some(Timestamp::from_secs(100)),
        );
        assert!(!s.is_expired(Timestamp::from_micros(99_999_999)));
        assert!(s.is_expired(Timestamp::from_secs(100)));
        assert!(s.is_expired(Timestamp::from_secs(101)));
    }

    #[test]
    fn test_section_versioned_round_trip() {
        let s = StoredSection::new(
            b"payload".to_vec(),
            Version::new(7),
            Timestamp::from_secs(1),
            None,
        );
        let v = s.versioned();
        assert_eq!(v.value, b"payload");
        assert_eq!(v.version, Version::new(7));
        assert_eq!(v.timestamp, Timestamp::from_secs(1));
    }
}
