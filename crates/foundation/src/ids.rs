use serde::{Deserialize, Serialize};

/// Synthetic numeric feature id used by the rendering engine to address
/// per-feature state.
///
/// Only meaningful within the projection that assigned it; a later
/// projection of a different business list may hand the same id to another
/// business.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl FeatureId {
    pub fn new(n: u64) -> Self {
        FeatureId(n)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Business ids are plain strings; the empty string means "none".
pub fn is_unset_id(id: &str) -> bool {
    id.is_empty()
}

#[cfg(test)]
mod tests {
    use super::{FeatureId, is_unset_id};

    #[test]
    fn feature_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&FeatureId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn empty_string_is_unset() {
        assert!(is_unset_id(""));
        assert!(!is_unset_id("a"));
    }
}
