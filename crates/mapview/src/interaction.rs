//! Reconciles pointer events on the business layer with shared selection
//! and hover state.
//!
//! The reconciler is a pure reducer: `(state, event) -> (state, commands)`.
//! Commands are executed against the engine by [`crate::engine::execute`].

use foundation::ids::{FeatureId, is_unset_id};
use layers::projection::{FeatureIndex, GeoFeature};
use layers::{FeatureCollection, FeatureStateKey, LayerId, SourceId};
use serde::{Deserialize, Serialize};

use crate::camera::FlyTo;
use crate::selection::{FeatureFlags, SelectionState};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    Click,
    Enter,
    Leave,
}

/// A feature the engine reports under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedFeature {
    /// Numeric id the engine addressed the feature by, if it reported one.
    pub feature_id: Option<FeatureId>,
    /// `properties.id` of the feature.
    pub business_id: Option<String>,
}

impl MatchedFeature {
    pub fn new(feature_id: Option<FeatureId>, business_id: Option<String>) -> Self {
        Self {
            feature_id,
            business_id,
        }
    }

    pub fn from_feature(feature: &GeoFeature) -> Self {
        Self::new(Some(feature.id), Some(feature.business_id().to_string()))
    }

    fn business_id(&self) -> Option<&str> {
        self.business_id.as_deref().filter(|id| !is_unset_id(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub layer: LayerId,
    #[serde(default)]
    pub features: Vec<MatchedFeature>,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, layer: LayerId, features: Vec<MatchedFeature>) -> Self {
        Self {
            kind,
            layer,
            features,
        }
    }

    pub fn click(features: Vec<MatchedFeature>) -> Self {
        Self::new(PointerEventKind::Click, LayerId::BUSINESSES, features)
    }

    pub fn enter(features: Vec<MatchedFeature>) -> Self {
        Self::new(PointerEventKind::Enter, LayerId::BUSINESSES, features)
    }

    pub fn leave() -> Self {
        Self::new(PointerEventKind::Leave, LayerId::BUSINESSES, Vec::new())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// Instruction for the rendering engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MapCommand {
    SetSourceData {
        source: SourceId,
        data: FeatureCollection,
    },
    SetFeatureState {
        source: SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    },
    /// Clears one flag only; other flags on the feature are untouched.
    ClearFeatureState {
        source: SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    },
    SetCursor {
        cursor: Cursor,
    },
    FlyTo(FlyTo),
}

/// Everything the reducer reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerState {
    pub selection: SelectionState,
    pub flags: FeatureFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ReconcilerState,
    pub commands: Vec<MapCommand>,
}

impl Transition {
    fn unchanged(state: &ReconcilerState) -> Self {
        Self {
            state: state.clone(),
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionReconciler {
    source: SourceId,
    layer: LayerId,
}

impl Default for InteractionReconciler {
    fn default() -> Self {
        Self::new(SourceId::MAP, LayerId::BUSINESSES)
    }
}

impl InteractionReconciler {
    pub fn new(source: SourceId, layer: LayerId) -> Self {
        Self { source, layer }
    }

    /// Applies one pointer event.
    ///
    /// Events on other layers, clicks without a matched business, and
    /// matches that no longer resolve in `index` change nothing visible. Any
    /// enter on the business layer switches to the pointer cursor.
    pub fn reduce(
        &self,
        state: &ReconcilerState,
        index: &FeatureIndex,
        event: &PointerEvent,
    ) -> Transition {
        if event.layer != self.layer {
            return Transition::unchanged(state);
        }
        match event.kind {
            PointerEventKind::Click => match first_business(&event.features) {
                Some((id, matched)) => {
                    let feature = resolve(index, id, matched.feature_id);
                    self.select_feature(state, id, feature)
                }
                None => Transition::unchanged(state),
            },
            PointerEventKind::Enter => match first_business(&event.features) {
                Some((id, matched)) => {
                    let feature = resolve(index, id, matched.feature_id);
                    self.hover_feature(state, id, feature)
                }
                None => Transition {
                    state: state.clone(),
                    commands: vec![MapCommand::SetCursor {
                        cursor: Cursor::Pointer,
                    }],
                },
            },
            PointerEventKind::Leave => self.leave(state),
        }
    }

    /// Selects `business_id` as if its feature had been clicked. An empty id
    /// deselects.
    pub fn select(
        &self,
        state: &ReconcilerState,
        index: &FeatureIndex,
        business_id: &str,
    ) -> Transition {
        let feature = index.feature_id(business_id);
        self.select_feature(state, business_id, feature)
    }

    /// Clears every flag the engine currently shows, keeping the ids.
    ///
    /// Issued against the outgoing projection, before its data is replaced.
    pub fn release(&self, state: &ReconcilerState) -> Transition {
        let mut next = state.clone();
        let mut commands = Vec::new();

        if let Some(f) = state.flags.selected {
            commands.push(self.clear(f, FeatureStateKey::Selected));
        }
        if let Some(f) = state.flags.hover {
            commands.push(self.clear(f, FeatureStateKey::Hover));
        }
        next.flags = FeatureFlags::default();

        Transition {
            state: next,
            commands,
        }
    }

    /// Flags the selected and hovered businesses in a fresh projection.
    ///
    /// Expects released flags. Ids of businesses that dropped out stay in the
    /// selection but carry no flag.
    pub fn reapply(&self, state: &ReconcilerState, index: &FeatureIndex) -> Transition {
        let mut next = state.clone();
        let mut commands = Vec::new();

        next.flags.selected = index.feature_id(&state.selection.selected_id);
        next.flags.hover = index.feature_id(&state.selection.hover_id);

        if let Some(f) = next.flags.selected {
            commands.push(self.set(f, FeatureStateKey::Selected));
        }
        if let Some(f) = next.flags.hover {
            commands.push(self.set(f, FeatureStateKey::Hover));
        }

        Transition {
            state: next,
            commands,
        }
    }

    fn select_feature(
        &self,
        state: &ReconcilerState,
        business_id: &str,
        feature: Option<FeatureId>,
    ) -> Transition {
        let mut next = state.clone();
        let mut commands = Vec::new();

        if let Some(prev) = state.flags.selected {
            commands.push(self.clear(prev, FeatureStateKey::Selected));
        }
        next.selection.selected_id = business_id.to_string();
        next.flags.selected = feature.filter(|_| !is_unset_id(business_id));
        if let Some(f) = next.flags.selected {
            commands.push(self.set(f, FeatureStateKey::Selected));
        }

        Transition {
            state: next,
            commands,
        }
    }

    fn hover_feature(
        &self,
        state: &ReconcilerState,
        business_id: &str,
        feature: Option<FeatureId>,
    ) -> Transition {
        let mut next = state.clone();
        let mut commands = vec![MapCommand::SetCursor {
            cursor: Cursor::Pointer,
        }];

        // Enter without a leave in between: drop the old flag first.
        if let Some(prev) = state.flags.hover {
            commands.push(self.clear(prev, FeatureStateKey::Hover));
        }
        next.selection.hover_id = business_id.to_string();
        next.flags.hover = feature;
        if let Some(f) = feature {
            commands.push(self.set(f, FeatureStateKey::Hover));
        }

        Transition {
            state: next,
            commands,
        }
    }

    fn leave(&self, state: &ReconcilerState) -> Transition {
        let mut next = state.clone();
        let mut commands = vec![MapCommand::SetCursor {
            cursor: Cursor::Default,
        }];

        if let Some(prev) = state.flags.hover {
            commands.push(self.clear(prev, FeatureStateKey::Hover));
        }
        next.selection.hover_id.clear();
        next.flags.hover = None;

        Transition {
            state: next,
            commands,
        }
    }

    fn set(&self, feature: FeatureId, key: FeatureStateKey) -> MapCommand {
        MapCommand::SetFeatureState {
            source: self.source.clone(),
            feature,
            key,
        }
    }

    fn clear(&self, feature: FeatureId, key: FeatureStateKey) -> MapCommand {
        MapCommand::ClearFeatureState {
            source: self.source.clone(),
            feature,
            key,
        }
    }
}

/// First matched feature that names a business.
fn first_business(features: &[MatchedFeature]) -> Option<(&str, &MatchedFeature)> {
    let first = features.first()?;
    first.business_id().map(|id| (id, first))
}

/// Feature id to flag for `business_id`.
///
/// Prefers the id the event itself carries when it still belongs to that
/// business in the current projection, then falls back to the index.
fn resolve(
    index: &FeatureIndex,
    business_id: &str,
    reported: Option<FeatureId>,
) -> Option<FeatureId> {
    reported
        .filter(|f| index.business_id(*f) == Some(business_id))
        .or_else(|| index.feature_id(business_id))
}
