use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Style-layer id, as used for event subscription and layer lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Cow<'static, str>);

impl LayerId {
    /// Individual (unclustered) business points.
    pub const BUSINESSES: LayerId = LayerId(Cow::Borrowed("businesses"));
    /// Cluster circles.
    pub const CLUSTERS: LayerId = LayerId(Cow::Borrowed("clusters"));
    /// Point-count labels drawn on top of cluster circles.
    pub const CLUSTER_COUNT: LayerId = LayerId(Cow::Borrowed("cluster-count"));

    pub fn new(id: impl Into<String>) -> Self {
        LayerId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// GeoJSON source id shared by all business layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Cow<'static, str>);

impl SourceId {
    pub const MAP: SourceId = SourceId(Cow::Borrowed("map"));

    pub fn new(id: impl Into<String>) -> Self {
        SourceId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        SourceId::MAP
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A style layer the core owns and hands to the rendering engine verbatim.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// Engine style JSON for this layer, bound to `source`.
    fn to_style_json(&self, source: &SourceId) -> Value;

    /// Whether pointer events on this layer are reported back.
    fn interactive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerId, SourceId};

    #[test]
    fn well_known_ids() {
        assert_eq!(LayerId::BUSINESSES.as_str(), "businesses");
        assert_eq!(LayerId::CLUSTERS.as_str(), "clusters");
        assert_eq!(LayerId::CLUSTER_COUNT.as_str(), "cluster-count");
        assert_eq!(SourceId::MAP.as_str(), "map");
    }

    #[test]
    fn owned_and_borrowed_ids_compare_equal() {
        assert_eq!(LayerId::new("businesses"), LayerId::BUSINESSES);
        assert_ne!(LayerId::new("roads"), LayerId::BUSINESSES);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&LayerId::CLUSTERS).unwrap();
        assert_eq!(json, "\"clusters\"");
        let back: LayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LayerId::CLUSTERS);
    }
}
