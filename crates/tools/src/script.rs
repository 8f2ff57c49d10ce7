//! Scripted interaction replay against a recording engine.

use std::collections::BTreeMap;

use catalog::BusinessRecord;
use layers::LayerId;
use mapview::MapViewSession;
use mapview::engine::RecordingEngine;
use mapview::interaction::{MapCommand, MatchedFeature, PointerEvent, PointerEventKind};
use serde::Deserialize;
use serde_json::{Value, json};

/// One line of a replay script.
///
/// Pointer steps name businesses by id; the numeric feature id is looked up
/// in the session's current projection, as the engine would report it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    Click {
        #[serde(default)]
        features: Vec<String>,
        #[serde(default)]
        layer: Option<LayerId>,
    },
    Enter {
        #[serde(default)]
        features: Vec<String>,
        #[serde(default)]
        layer: Option<LayerId>,
    },
    Leave {
        #[serde(default)]
        layer: Option<LayerId>,
    },
    Select {
        id: String,
    },
    Move {
        longitude: f64,
        latitude: f64,
        zoom: f64,
    },
    DragStart,
    DragEnd,
    Businesses {
        businesses: Vec<BusinessRecord>,
    },
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptStep>, String> {
    serde_json::from_str(raw).map_err(|e| format!("script: {e}"))
}

/// Runs `step` and returns the commands it produced.
pub fn run_step(
    session: &mut MapViewSession,
    engine: &mut RecordingEngine,
    step: &ScriptStep,
) -> Vec<MapCommand> {
    let commands = match step {
        ScriptStep::Click { features, layer } => {
            let event = pointer(session, PointerEventKind::Click, layer, features);
            session.handle_pointer(&event)
        }
        ScriptStep::Enter { features, layer } => {
            let event = pointer(session, PointerEventKind::Enter, layer, features);
            session.handle_pointer(&event)
        }
        ScriptStep::Leave { layer } => {
            let event = pointer(session, PointerEventKind::Leave, layer, &[]);
            session.handle_pointer(&event)
        }
        ScriptStep::Select { id } => session.set_selected_id(id),
        ScriptStep::Move {
            longitude,
            latitude,
            zoom,
        } => {
            session.on_move(*longitude, *latitude, *zoom);
            Vec::new()
        }
        ScriptStep::DragStart => {
            session.on_drag_start();
            Vec::new()
        }
        ScriptStep::DragEnd => {
            session.on_drag_end();
            Vec::new()
        }
        ScriptStep::Businesses { businesses } => session.set_businesses(businesses.clone()),
    };
    session.execute(engine, &commands);
    commands
}

fn pointer(
    session: &MapViewSession,
    kind: PointerEventKind,
    layer: &Option<LayerId>,
    features: &[String],
) -> PointerEvent {
    let matched = features
        .iter()
        .map(|id| MatchedFeature::new(session.feature_index().feature_id(id), Some(id.clone())))
        .collect();
    PointerEvent::new(
        kind,
        layer.clone().unwrap_or(LayerId::BUSINESSES),
        matched,
    )
}

/// JSON summary of a replay: per-step commands, final shared state,
/// change feed, and metrics.
pub fn replay(
    session: &mut MapViewSession,
    engine: &mut RecordingEngine,
    steps: &[ScriptStep],
) -> Value {
    let mut per_step = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let commands = run_step(session, engine, step);
        per_step.push(json!({ "step": i, "commands": commands }));
    }

    let store = session.store();
    let store = store.borrow();
    let changes: Vec<Value> = store
        .changes()
        .iter()
        .map(|e| json!({ "seq": e.seq, "change": e.payload }))
        .collect();
    let snapshot = session.metrics().snapshot();

    json!({
        "steps": per_step,
        "final": {
            "selection": store.selection(),
            "viewport": store.viewport(),
            "cursor": engine.cursor(),
            "flights": engine.flights(),
        },
        "changes": changes,
        "metrics": {
            "counters": snapshot.counters.into_iter().collect::<BTreeMap<_, _>>(),
            "gauges": snapshot.gauges.into_iter().collect::<BTreeMap<_, _>>(),
        },
    })
}
