//! Tower identity
//!
//! A [`TowerId`] pairs a human-readable name with a sequence number that is
//! unique within the process. Equality, hashing and ordering use the sequence
//! number only, so two towers may share a name without being confused.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::error::IdentityError;

/// Longest accepted tower name, in bytes
pub const MAX_NAME_LEN: usize = 64;

static NEXT_TOWER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a tower
///
/// Cheap to clone: the name is shared.
#[derive(Debug, Clone)]
pub struct TowerId {
    seq: u64,
    name: Arc<str>,
}

impl TowerId {
    /// Allocate a fresh identity for a tower with the given name
    pub fn new(name: impl AsRef<str>) -> Result<Self, IdentityError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(IdentityError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self {
            seq: NEXT_TOWER_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            name: Arc::from(name),
        })
    }

    /// The name this tower was created with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process-unique sequence number
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Short form for logging (`name#seq`)
    pub fn short_id(&self) -> String {
        format!("{}#{}", self.name, self.seq)
    }
}

impl PartialEq for TowerId {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for TowerId {}

impl Hash for TowerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

impl PartialOrd for TowerId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TowerId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

impl Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl AsRef<TowerId> for TowerId {
    fn as_ref(&self) -> &TowerId {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tower_id_creation() {
        assert!(TowerId::new("a").is_ok());
        assert_eq!(TowerId::new(""), Err(IdentityError::EmptyName));

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            TowerId::new(&long),
            Err(IdentityError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_same_name_distinct_identity() {
        let a1 = TowerId::new("a").unwrap();
        let a2 = TowerId::new("a").unwrap();

        assert_ne!(a1, a2);
        assert_eq!(a1.name(), a2.name());
        assert_eq!(a1, a1.clone());

        let set: HashSet<_> = [a1.clone(), a2, a1].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ordering_follows_creation() {
        let first = TowerId::new("z").unwrap();
        let second = TowerId::new("a").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_display_and_short_id() {
        let id = TowerId::new("north").unwrap();
        assert_eq!(format!("{}", id), "north");
        assert_eq!(id.short_id(), format!("north#{}", id.seq()));
    }
}
