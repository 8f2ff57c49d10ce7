use std::collections::HashMap;

use catalog::BusinessRecord;
use foundation::coord::LngLat;
use foundation::ids::FeatureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

impl Geometry {
    pub fn point(c: LngLat) -> Self {
        Geometry::Point {
            coordinates: c.to_array(),
        }
    }
}

/// Static per-feature properties. `id` is the business id (a string), not
/// the numeric feature id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct GeoFeature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl GeoFeature {
    pub fn business_id(&self) -> &str {
        &self.properties.id
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<GeoFeature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index(&self) -> FeatureIndex {
        FeatureIndex::build(self)
    }
}

/// Projects businesses into map features.
///
/// Ordering contract:
/// - Features keep the input order of the businesses they come from.
/// - Businesses without a location are skipped.
/// - Feature ids are the 0-based position in the output, so projecting the
///   same list twice gives identical collections. Ids are not stable across
///   different lists.
pub fn project(businesses: &[BusinessRecord]) -> FeatureCollection {
    let features = businesses
        .iter()
        .filter_map(|b| b.coordinate().map(|c| (b, c)))
        .enumerate()
        .map(|(i, (b, c))| GeoFeature {
            id: FeatureId::new(i as u64),
            geometry: Geometry::point(c),
            properties: FeatureProperties {
                id: b.id.clone(),
                name: b.name.clone(),
                category: b.category.clone(),
                tags: b.tags.clone(),
            },
        })
        .collect();

    FeatureCollection { features }
}

/// Two-way lookup between business ids and the feature ids of one projection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeatureIndex {
    by_business: HashMap<String, FeatureId>,
    by_feature: HashMap<FeatureId, String>,
}

impl FeatureIndex {
    pub fn build(collection: &FeatureCollection) -> Self {
        let mut out = Self::default();
        for f in &collection.features {
            // First occurrence wins if a business id repeats.
            out.by_business
                .entry(f.properties.id.clone())
                .or_insert(f.id);
            out.by_feature.insert(f.id, f.properties.id.clone());
        }
        out
    }

    pub fn feature_id(&self, business_id: &str) -> Option<FeatureId> {
        if business_id.is_empty() {
            return None;
        }
        self.by_business.get(business_id).copied()
    }

    pub fn business_id(&self, feature: FeatureId) -> Option<&str> {
        self.by_feature.get(&feature).map(String::as_str)
    }

    pub fn contains_feature(&self, feature: FeatureId) -> bool {
        self.by_feature.contains_key(&feature)
    }

    pub fn len(&self) -> usize {
        self.by_feature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_feature.is_empty()
    }
}
