//! ConsumerId - Cheap-to-clone consumer identifier
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Consumer identifier with cheap cloning.
///
/// Internally uses `Arc<str>` so cloning only increments a reference count.
/// Consumer ids are created once when a consumer is built and cloned on every
/// attach, registry lookup and log line, so the O(1) clone matters.
///
/// # Examples
/// ```
/// use contracts::ConsumerId;
///
/// let id: ConsumerId = "hud_preview".into();
/// let id2 = id.clone();
/// assert_eq!(id, id2);
/// assert_eq!(id.as_str(), "hud_preview");
/// ```
#[derive(Clone, Default)]
pub struct ConsumerId(Arc<str>);

impl ConsumerId {
    /// Create a new ConsumerId from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ConsumerId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ConsumerId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ConsumerId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConsumerId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ConsumerId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsumerId({:?})", self.0)
    }
}

impl PartialEq for ConsumerId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ConsumerId {}

impl PartialEq<str> for ConsumerId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ConsumerId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for ConsumerId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for ConsumerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ConsumerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_is_cheap() {
        let id1: ConsumerId = "preview".into();
        let id2 = id1.clone();

        // Both should point to the same underlying data
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_equality() {
        let id: ConsumerId = "recorder".into();
        assert_eq!(id, "recorder");
        assert_eq!(id, ConsumerId::from("recorder"));
    }

    #[test]
    fn test_hashmap_key() {
        let mut map: HashMap<ConsumerId, i32> = HashMap::new();
        map.insert("consumer_a".into(), 1);
        map.insert("consumer_b".into(), 2);

        // Can lookup with &str
        assert_eq!(map.get("consumer_a"), Some(&1));
        assert_eq!(map.get("consumer_b"), Some(&2));
    }

    #[test]
    fn test_serde() {
        let id: ConsumerId = "hud".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"hud\"");

        let parsed: ConsumerId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
