use std::collections::{BTreeMap, BTreeSet};

use foundation::ids::FeatureId;
use layers::{FeatureCollection, FeatureStateKey, SourceId};
use runtime::metrics::Metrics;
use tracing::debug;

use crate::camera::FlyTo;
use crate::interaction::{Cursor, MapCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    FeatureNotFound { source: SourceId, feature: FeatureId },
    SourceNotLoaded(SourceId),
    Rejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::FeatureNotFound { source, feature } => {
                write!(f, "feature {feature} not found in source {source}")
            }
            EngineError::SourceNotLoaded(source) => write!(f, "source {source} is not loaded"),
            EngineError::Rejected(msg) => write!(f, "engine rejected command: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// The slice of the rendering engine the business view drives.
pub trait MapEngine {
    fn set_source_data(
        &mut self,
        source: &SourceId,
        data: &FeatureCollection,
    ) -> Result<(), EngineError>;

    fn set_feature_state(
        &mut self,
        source: &SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    ) -> Result<(), EngineError>;

    /// Removes a single state key; other keys on the feature stay.
    fn remove_feature_state(
        &mut self,
        source: &SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    ) -> Result<(), EngineError>;

    fn fly_to(&mut self, target: &FlyTo) -> Result<(), EngineError>;

    fn set_cursor(&mut self, cursor: Cursor) -> Result<(), EngineError>;
}

/// Runs `commands` in order against `engine`.
///
/// Engine failures are logged, counted under `engine.command_failed`, and
/// otherwise ignored; later commands still run. Returns the number of
/// commands the engine accepted.
pub fn execute(engine: &mut dyn MapEngine, commands: &[MapCommand], metrics: &mut Metrics) -> usize {
    let mut applied = 0;
    for command in commands {
        let result = match command {
            MapCommand::SetSourceData { source, data } => engine.set_source_data(source, data),
            MapCommand::SetFeatureState {
                source,
                feature,
                key,
            } => engine.set_feature_state(source, *feature, *key),
            MapCommand::ClearFeatureState {
                source,
                feature,
                key,
            } => engine.remove_feature_state(source, *feature, *key),
            MapCommand::SetCursor { cursor } => engine.set_cursor(*cursor),
            MapCommand::FlyTo(target) => engine.fly_to(target),
        };
        match result {
            Ok(()) => {
                applied += 1;
                metrics.inc_counter("engine.command_applied", 1);
            }
            Err(err) => {
                debug!(%err, "engine command failed; ignoring");
                metrics.inc_counter("engine.command_failed", 1);
            }
        }
    }
    applied
}

/// In-memory engine that records what a real renderer would display.
///
/// Feature-state persists across `set_source_data`, as it does in the
/// engine the view targets; commands against ids missing from the current
/// data fail with [`EngineError::FeatureNotFound`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingEngine {
    sources: BTreeMap<SourceId, BTreeSet<FeatureId>>,
    feature_state: BTreeMap<(SourceId, FeatureId), BTreeSet<FeatureStateKey>>,
    flights: Vec<FlyTo>,
    cursor: Cursor,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features of `source` carrying `key`, ascending.
    pub fn flagged(&self, source: &SourceId, key: FeatureStateKey) -> Vec<FeatureId> {
        self.feature_state
            .iter()
            .filter(|((s, _), keys)| s == source && keys.contains(&key))
            .map(|((_, f), _)| *f)
            .collect()
    }

    pub fn has_flag(&self, source: &SourceId, feature: FeatureId, key: FeatureStateKey) -> bool {
        self.feature_state
            .get(&(source.clone(), feature))
            .is_some_and(|keys| keys.contains(&key))
    }

    pub fn flights(&self) -> &[FlyTo] {
        &self.flights
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn check_feature(&self, source: &SourceId, feature: FeatureId) -> Result<(), EngineError> {
        let features = self
            .sources
            .get(source)
            .ok_or_else(|| EngineError::SourceNotLoaded(source.clone()))?;
        if features.contains(&feature) {
            Ok(())
        } else {
            Err(EngineError::FeatureNotFound {
                source: source.clone(),
                feature,
            })
        }
    }
}

impl MapEngine for RecordingEngine {
    fn set_source_data(
        &mut self,
        source: &SourceId,
        data: &FeatureCollection,
    ) -> Result<(), EngineError> {
        let ids = data.features.iter().map(|f| f.id).collect();
        self.sources.insert(source.clone(), ids);
        Ok(())
    }

    fn set_feature_state(
        &mut self,
        source: &SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    ) -> Result<(), EngineError> {
        self.check_feature(source, feature)?;
        self.feature_state
            .entry((source.clone(), feature))
            .or_default()
            .insert(key);
        Ok(())
    }

    fn remove_feature_state(
        &mut self,
        source: &SourceId,
        feature: FeatureId,
        key: FeatureStateKey,
    ) -> Result<(), EngineError> {
        self.check_feature(source, feature)?;
        if let Some(keys) = self.feature_state.get_mut(&(source.clone(), feature)) {
            keys.remove(&key);
            if keys.is_empty() {
                self.feature_state.remove(&(source.clone(), feature));
            }
        }
        Ok(())
    }

    fn fly_to(&mut self, target: &FlyTo) -> Result<(), EngineError> {
        self.flights.push(*target);
        Ok(())
    }

    fn set_cursor(&mut self, cursor: Cursor) -> Result<(), EngineError> {
        self.cursor = cursor;
        Ok(())
    }
}
