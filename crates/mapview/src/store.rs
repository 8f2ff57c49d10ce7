use std::cell::RefCell;
use std::rc::Rc;

use runtime::event_bus::{Event, EventBus, SubscriptionId};
use serde::{Deserialize, Serialize};

use crate::selection::SelectionState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragState {
    On,
    #[default]
    Off,
}

/// Camera position plus whether the user is dragging the map.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub drag: DragState,
}

impl ViewportState {
    pub fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            drag: DragState::Off,
        }
    }
}

/// One mutation of the store, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ViewChange {
    Camera {
        longitude: f64,
        latitude: f64,
        zoom: f64,
    },
    Drag {
        state: DragState,
    },
    Selected {
        id: String,
    },
    Hover {
        id: String,
    },
}

/// View state shared by every surface of the business view (map, list,
/// info panel) for the lifetime of one browsing session.
///
/// Reads are public. Writes go through the map session so selection
/// always runs the full pipeline (feature flags and camera); each write
/// that changes something is published on the change feed.
#[derive(Debug)]
pub struct ViewStateStore {
    viewport: ViewportState,
    selection: SelectionState,
    changes: EventBus<ViewChange>,
}

/// Handle surfaces hold on to; the view is single-threaded.
pub type SharedViewState = Rc<RefCell<ViewStateStore>>;

/// Number of recent changes kept in the store's log.
pub const CHANGE_LOG_LIMIT: usize = 1024;

impl ViewStateStore {
    pub fn new(viewport: ViewportState) -> Self {
        Self {
            viewport,
            selection: SelectionState::default(),
            changes: EventBus::with_log_limit(CHANGE_LOG_LIMIT),
        }
    }

    pub fn shared(viewport: ViewportState) -> SharedViewState {
        Rc::new(RefCell::new(Self::new(viewport)))
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn drag_state(&self) -> DragState {
        self.viewport.drag
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selected_id(&self) -> &str {
        &self.selection.selected_id
    }

    pub fn hover_id(&self) -> &str {
        &self.selection.hover_id
    }

    /// Subscribers are called once the mutating session call has released
    /// the store, so they may read it through their own handle.
    pub fn subscribe(&mut self, f: impl FnMut(&Event<ViewChange>) + 'static) -> SubscriptionId {
        self.changes.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }

    /// The most recent [`CHANGE_LOG_LIMIT`] changes, oldest first.
    pub fn changes(&self) -> &[Event<ViewChange>] {
        self.changes.events()
    }

    pub fn drain_changes(&mut self) -> Vec<Event<ViewChange>> {
        self.changes.drain()
    }

    /// Hands queued changes to subscribers without holding the store borrow.
    pub(crate) fn notify(shared: &SharedViewState) {
        let delivery = {
            let mut store = shared.borrow_mut();
            if !store.changes.has_pending() {
                return;
            }
            store.changes.take_delivery()
        };
        delivery.run();
    }

    pub(crate) fn set_camera(&mut self, longitude: f64, latitude: f64, zoom: f64) {
        let v = &mut self.viewport;
        if v.longitude == longitude && v.latitude == latitude && v.zoom == zoom {
            return;
        }
        v.longitude = longitude;
        v.latitude = latitude;
        v.zoom = zoom;
        self.changes.queue(ViewChange::Camera {
            longitude,
            latitude,
            zoom,
        });
    }

    pub(crate) fn set_drag_state(&mut self, state: DragState) {
        if self.viewport.drag == state {
            return;
        }
        self.viewport.drag = state;
        self.changes.queue(ViewChange::Drag { state });
    }

    pub(crate) fn set_selected_id(&mut self, id: &str) {
        if self.selection.selected_id == id {
            return;
        }
        self.selection.selected_id = id.to_string();
        self.changes.queue(ViewChange::Selected { id: id.to_string() });
    }

    pub(crate) fn set_hover_id(&mut self, id: &str) {
        if self.selection.hover_id == id {
            return;
        }
        self.selection.hover_id = id.to_string();
        self.changes.queue(ViewChange::Hover { id: id.to_string() });
    }
}
