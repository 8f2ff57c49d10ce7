use foundation::ids::{FeatureId, is_unset_id};
use serde::{Deserialize, Serialize};

/// Shared selection/hover ids. An empty string means "none" on either axis.
///
/// The two axes are independent: a business may be hovered and selected at
/// the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_id: String,
    pub hover_id: String,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        non_empty(&self.selected_id)
    }

    pub fn hovered(&self) -> Option<&str> {
        non_empty(&self.hover_id)
    }

    pub fn is_selected(&self, business_id: &str) -> bool {
        self.selected() == Some(business_id)
    }

    pub fn is_hovered(&self, business_id: &str) -> bool {
        self.hovered() == Some(business_id)
    }
}

fn non_empty(id: &str) -> Option<&str> {
    if is_unset_id(id) { None } else { Some(id) }
}

/// Numeric features that currently carry a visual flag in the engine.
///
/// Tracked separately from [`SelectionState`] so a flag is always cleared on
/// exactly the feature it was set on.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub selected: Option<FeatureId>,
    pub hover: Option<FeatureId>,
}
