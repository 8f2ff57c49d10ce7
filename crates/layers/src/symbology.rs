use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Bump whenever any value in [`ClusterPolicy::default`] changes.
pub const CLUSTER_POLICY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step<T> {
    pub threshold: u64,
    pub value: T,
}

/// Piecewise-constant lookup over a non-negative count.
///
/// Ordering contract:
/// - `steps` are sorted by strictly increasing `threshold`.
/// - An input selects the value of the last step whose threshold is `<=` the
///   input, or `base` if there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExpr<T> {
    pub base: T,
    pub steps: Vec<Step<T>>,
}

impl<T> StepExpr<T> {
    pub fn new(base: T) -> Self {
        Self {
            base,
            steps: Vec::new(),
        }
    }

    /// Appends a break point. Thresholds that do not increase are ignored.
    pub fn step(mut self, threshold: u64, value: T) -> Self {
        if self.steps.last().is_none_or(|s| s.threshold < threshold) {
            self.steps.push(Step { threshold, value });
        }
        self
    }

    pub fn evaluate(&self, input: u64) -> &T {
        let idx = self.steps.partition_point(|s| s.threshold <= input);
        match idx {
            0 => &self.base,
            n => &self.steps[n - 1].value,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> StepExpr<U> {
        StepExpr {
            base: f(&self.base),
            steps: self
                .steps
                .iter()
                .map(|s| Step {
                    threshold: s.threshold,
                    value: f(&s.value),
                })
                .collect(),
        }
    }

    pub fn thresholds(&self) -> impl Iterator<Item = u64> + '_ {
        self.steps.iter().map(|s| s.threshold)
    }
}

impl<T: Serialize> StepExpr<T> {
    /// `["step", input, base, t1, v1, t2, v2, ...]`
    pub fn to_expression(&self, input: Value) -> Value {
        let mut out = vec![json!("step"), input, json!(self.base)];
        for s in &self.steps {
            out.push(json!(s.threshold));
            out.push(json!(s.value));
        }
        Value::Array(out)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSize {
    Small,
    Medium,
    Large,
}

/// Visual treatment of one cluster marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeTier {
    pub size: TierSize,
    pub radius_px: f64,
    pub color: String,
}

impl SizeTier {
    pub fn new(size: TierSize, radius_px: f64, color: impl Into<String>) -> Self {
        Self {
            size,
            radius_px,
            color: color.into(),
        }
    }
}

/// How the engine aggregates nearby business points.
///
/// Consumed by the engine verbatim; kept here so it can be versioned and
/// tested without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPolicy {
    pub version: u32,
    /// Zoom at and above which points are drawn unclustered.
    pub cluster_max_zoom: u8,
    pub cluster_radius_px: u32,
    pub tiers: StepExpr<SizeTier>,
    pub count_label_size: f64,
    pub count_label_fonts: Vec<String>,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self {
            version: CLUSTER_POLICY_VERSION,
            cluster_max_zoom: 14,
            cluster_radius_px: 50,
            tiers: StepExpr::new(SizeTier::new(TierSize::Small, 20.0, "#51bbd6"))
                .step(100, SizeTier::new(TierSize::Medium, 30.0, "#f1f075"))
                .step(750, SizeTier::new(TierSize::Large, 40.0, "#f28cb1")),
            count_label_size: 12.0,
            count_label_fonts: vec![
                "DIN Offc Pro Medium".to_string(),
                "Arial Unicode MS Bold".to_string(),
            ],
        }
    }
}

impl ClusterPolicy {
    pub fn size_tier(&self, point_count: u64) -> &SizeTier {
        self.tiers.evaluate(point_count)
    }

    /// True if the engine aggregates points at `zoom`.
    pub fn clusters_at(&self, zoom: f64) -> bool {
        zoom < f64::from(self.cluster_max_zoom)
    }

    pub fn circle_color_expression(&self) -> Value {
        self.tiers
            .map(|t| t.color.clone())
            .to_expression(point_count_input())
    }

    pub fn circle_radius_expression(&self) -> Value {
        self.tiers
            .map(|t| t.radius_px)
            .to_expression(point_count_input())
    }
}

fn point_count_input() -> Value {
    json!(["get", "point_count"])
}

/// Per-feature transient flags managed through the engine's feature-state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStateKey {
    Hover,
    Selected,
}

impl FeatureStateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStateKey::Hover => "hover",
            FeatureStateKey::Selected => "selected",
        }
    }
}

/// Label colours for individual business points. Selection wins over hover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPaint {
    pub selected_color: String,
    pub hover_color: String,
    pub default_color: String,
    pub text_size: f64,
    pub icon_image: String,
    pub icon_size: f64,
}

impl Default for LabelPaint {
    fn default() -> Self {
        Self {
            selected_color: "#b91c1c".to_string(),
            hover_color: "#0057B8".to_string(),
            default_color: "#000000".to_string(),
            text_size: 16.0,
            icon_image: "restaurant".to_string(),
            icon_size: 1.2,
        }
    }
}

impl LabelPaint {
    pub fn text_color(&self, selected: bool, hovered: bool) -> &str {
        if selected {
            &self.selected_color
        } else if hovered {
            &self.hover_color
        } else {
            &self.default_color
        }
    }

    pub fn text_color_expression(&self) -> Value {
        json!([
            "case",
            feature_state_flag(FeatureStateKey::Selected),
            self.selected_color,
            feature_state_flag(FeatureStateKey::Hover),
            self.hover_color,
            self.default_color,
        ])
    }
}

fn feature_state_flag(key: FeatureStateKey) -> Value {
    json!(["boolean", ["feature-state", key.as_str()], false])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn size_tiers_break_at_100_and_750() {
        let p = ClusterPolicy::default();
        assert_eq!(p.size_tier(0).size, TierSize::Small);
        assert_eq!(p.size_tier(99).size, TierSize::Small);
        assert_eq!(p.size_tier(100).size, TierSize::Medium);
        assert_eq!(p.size_tier(749).size, TierSize::Medium);
        assert_eq!(p.size_tier(750).size, TierSize::Large);
        assert_eq!(p.size_tier(10_000).color, "#f28cb1");
    }

    #[test]
    fn defaults_match_published_policy() {
        let p = ClusterPolicy::default();
        assert_eq!(p.version, CLUSTER_POLICY_VERSION);
        assert_eq!(p.cluster_max_zoom, 14);
        assert_eq!(p.cluster_radius_px, 50);
        assert_eq!(p.count_label_size, 12.0);
        assert_eq!(p.tiers.thresholds().collect::<Vec<_>>(), vec![100, 750]);
    }

    #[test]
    fn clustering_stops_at_max_zoom() {
        let p = ClusterPolicy::default();
        assert!(p.clusters_at(13.9));
        assert!(!p.clusters_at(14.0));
        assert!(!p.clusters_at(18.0));
    }

    #[test]
    fn step_ignores_non_increasing_thresholds() {
        let e = StepExpr::new(0).step(10, 1).step(10, 2).step(5, 3).step(20, 4);
        assert_eq!(e.thresholds().collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(*e.evaluate(9), 0);
        assert_eq!(*e.evaluate(10), 1);
        assert_eq!(*e.evaluate(25), 4);
    }

    #[test]
    fn step_expressions_render_engine_syntax() {
        let p = ClusterPolicy::default();
        assert_eq!(
            p.circle_color_expression(),
            json!(["step", ["get", "point_count"], "#51bbd6", 100, "#f1f075", 750, "#f28cb1"])
        );
        assert_eq!(
            p.circle_radius_expression(),
            json!(["step", ["get", "point_count"], 20.0, 100, 30.0, 750, 40.0])
        );
    }

    #[test]
    fn selected_label_colour_wins_over_hover() {
        let paint = LabelPaint::default();
        assert_eq!(paint.text_color(true, true), "#b91c1c");
        assert_eq!(paint.text_color(false, true), "#0057B8");
        assert_eq!(paint.text_color(false, false), "#000000");
    }

    #[test]
    fn text_colour_expression_checks_selected_first() {
        let expr = LabelPaint::default().text_color_expression();
        assert_eq!(expr[0], "case");
        assert_eq!(expr[1], json!(["boolean", ["feature-state", "selected"], false]));
        assert_eq!(expr[3], json!(["boolean", ["feature-state", "hover"], false]));
        assert_eq!(expr[5], "#000000");
    }
}
