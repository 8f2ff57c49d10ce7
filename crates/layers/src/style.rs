//! Source and layer definitions handed to the rendering engine.

use serde_json::{Value, json};

use crate::layer::{Layer, LayerId, SourceId};
use crate::projection::FeatureCollection;
use crate::symbology::{ClusterPolicy, LabelPaint};

/// Individual business points with their name as label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusinessesLayer {
    pub paint: LabelPaint,
}

impl Layer for BusinessesLayer {
    fn id(&self) -> LayerId {
        LayerId::BUSINESSES
    }

    fn to_style_json(&self, source: &SourceId) -> Value {
        json!({
            "id": self.id(),
            "type": "symbol",
            "source": source,
            "filter": ["!", ["has", "point_count"]],
            "layout": {
                "text-field": ["get", "name"],
                "text-justify": "auto",
                "text-variable-anchor": [
                    "left", "right", "top", "bottom",
                    "top-left", "top-right", "bottom-left", "bottom-right"
                ],
                "text-radial-offset": 1,
                "icon-image": self.paint.icon_image,
                "icon-size": self.paint.icon_size,
                "text-size": self.paint.text_size,
                "text-optional": true,
                "icon-allow-overlap": true
            },
            "paint": {
                "text-color": self.paint.text_color_expression()
            }
        })
    }

    fn interactive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterLayer {
    pub policy: ClusterPolicy,
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        LayerId::CLUSTERS
    }

    fn to_style_json(&self, source: &SourceId) -> Value {
        json!({
            "id": self.id(),
            "type": "circle",
            "source": source,
            "filter": ["has", "point_count"],
            "paint": {
                "circle-color": self.policy.circle_color_expression(),
                "circle-radius": self.policy.circle_radius_expression()
            }
        })
    }

    fn interactive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterCountLayer {
    pub policy: ClusterPolicy,
}

impl Layer for ClusterCountLayer {
    fn id(&self) -> LayerId {
        LayerId::CLUSTER_COUNT
    }

    fn to_style_json(&self, source: &SourceId) -> Value {
        json!({
            "id": self.id(),
            "type": "symbol",
            "source": source,
            "filter": ["has", "point_count"],
            "layout": {
                "text-field": "{point_count_abbreviated}",
                "text-font": self.policy.count_label_fonts,
                "text-size": self.policy.count_label_size
            }
        })
    }
}

/// Full map style for the business view: one clustered GeoJSON source and
/// the layers drawn from it, bottom to top.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusinessMapStyle {
    pub source: SourceId,
    pub policy: ClusterPolicy,
    pub paint: LabelPaint,
}

impl BusinessMapStyle {
    pub fn layers(&self) -> Vec<Box<dyn Layer>> {
        vec![
            Box::new(BusinessesLayer {
                paint: self.paint.clone(),
            }),
            Box::new(ClusterLayer {
                policy: self.policy.clone(),
            }),
            Box::new(ClusterCountLayer {
                policy: self.policy.clone(),
            }),
        ]
    }

    pub fn interactive_layer_ids(&self) -> Vec<LayerId> {
        self.layers()
            .iter()
            .filter(|l| l.interactive())
            .map(|l| l.id())
            .collect()
    }

    pub fn layers_json(&self) -> Vec<Value> {
        self.layers()
            .iter()
            .map(|l| l.to_style_json(&self.source))
            .collect()
    }

    /// GeoJSON source definition. `generateId` stays on so the engine accepts
    /// numeric feature ids for feature-state.
    pub fn source_json(&self, data: &FeatureCollection) -> Value {
        json!({
            "type": "geojson",
            "data": data,
            "generateId": true,
            "cluster": true,
            "clusterMaxZoom": self.policy.cluster_max_zoom,
            "clusterRadius": self.policy.cluster_radius_px
        })
    }
}
