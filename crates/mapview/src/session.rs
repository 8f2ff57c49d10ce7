use catalog::{BusinessRecord, count_online_only, find_business_by_id};
use layers::{FeatureCollection, FeatureIndex, SourceId, project};
use runtime::metrics::Metrics;
use tracing::{debug, info};

use crate::camera::{CameraController, FlyTo, initial_viewport};
use crate::config::MapConfig;
use crate::engine::{MapEngine, execute};
use crate::interaction::{
    InteractionReconciler, MapCommand, PointerEvent, ReconcilerState, Transition,
};
use crate::selection::FeatureFlags;
use crate::store::{DragState, SharedViewState, ViewStateStore};

/// The map half of the business view.
///
/// Owns the projection of the current business list and the reconciler's
/// flag bookkeeping; selection, hover and viewport live in the shared store
/// so the list and info panel read the same values the map acts on.
#[derive(Debug)]
pub struct MapViewSession {
    store: SharedViewState,
    source: SourceId,
    reconciler: InteractionReconciler,
    camera: CameraController,
    flags: FeatureFlags,
    businesses: Vec<BusinessRecord>,
    collection: FeatureCollection,
    index: FeatureIndex,
    metrics: Metrics,
}

impl MapViewSession {
    /// Builds the session and points the store's viewport at the initial
    /// camera position. Call [`MapViewSession::mount`] once the engine is
    /// ready to receive the source data.
    ///
    /// Store subscribers are notified at the end of every session call, after
    /// the store borrow has been released.
    pub fn new(config: &MapConfig, store: SharedViewState, businesses: Vec<BusinessRecord>) -> Self {
        let viewport = {
            let s = store.borrow();
            initial_viewport(config, find_business_by_id(&businesses, s.selected_id()))
        };
        debug!(
            longitude = viewport.longitude,
            latitude = viewport.latitude,
            zoom = viewport.zoom,
            "loading map view"
        );
        store
            .borrow_mut()
            .set_camera(viewport.longitude, viewport.latitude, viewport.zoom);
        ViewStateStore::notify(&store);

        let collection = project(&businesses);
        let index = collection.index();
        let mut metrics = Metrics::new();
        metrics.set_gauge("map.features", collection.len() as i64);
        metrics.set_gauge("map.online_only", count_online_only(&businesses) as i64);

        Self {
            store,
            source: SourceId::MAP,
            reconciler: InteractionReconciler::default(),
            camera: CameraController::from_config(config),
            flags: FeatureFlags::default(),
            businesses,
            collection,
            index,
            metrics,
        }
    }

    pub fn store(&self) -> SharedViewState {
        self.store.clone()
    }

    pub fn feature_collection(&self) -> &FeatureCollection {
        &self.collection
    }

    pub fn feature_index(&self) -> &FeatureIndex {
        &self.index
    }

    pub fn businesses(&self) -> &[BusinessRecord] {
        &self.businesses
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Source data plus flags for a selection made before the map existed,
    /// and the camera move to it.
    pub fn mount(&mut self) -> Vec<MapCommand> {
        let mut commands = vec![self.source_data_command()];
        let t = self.reconciler.reapply(&self.reconciler_state(), &self.index);
        commands.extend(self.commit(t, false));

        let selected = self.store.borrow().selected_id().to_string();
        if let Some(fly) = self.camera.on_mount(&selected, &self.businesses) {
            commands.push(self.fly_to(&selected, fly));
        }
        self.notify();
        commands
    }

    /// Replaces the business list (new search results) and re-projects.
    ///
    /// Flags are cleared against the outgoing data before the new data is
    /// sent, then re-applied by business id. A selected business that only
    /// now has a location gets the camera move it could not get before.
    pub fn set_businesses(&mut self, businesses: Vec<BusinessRecord>) -> Vec<MapCommand> {
        let selected = self.store.borrow().selected_id().to_string();
        let follow = self
            .camera
            .on_businesses_changed(&selected, &self.businesses, &businesses);

        let released = self.reconciler.release(&self.reconciler_state());
        let mut commands = self.commit(released, false);

        self.collection = project(&businesses);
        self.index = self.collection.index();
        let online_only = count_online_only(&businesses);
        self.businesses = businesses;

        debug!(
            features = self.collection.len(),
            online_only, "re-projected business list"
        );
        self.metrics
            .set_gauge("map.features", self.collection.len() as i64);
        self.metrics.set_gauge("map.online_only", online_only as i64);
        self.metrics.inc_counter("map.reprojections", 1);

        commands.push(self.source_data_command());
        let t = self.reconciler.reapply(&self.reconciler_state(), &self.index);
        commands.extend(self.commit(t, false));
        if let Some(fly) = follow {
            commands.push(self.fly_to(&selected, fly));
        }
        self.notify();
        commands
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<MapCommand> {
        let t = self
            .reconciler
            .reduce(&self.reconciler_state(), &self.index, event);
        let commands = self.commit(t, true);
        self.notify();
        commands
    }

    /// Selection from outside the map (e.g. a list card). Runs the same
    /// pipeline as a click, camera move included. `""` deselects.
    pub fn set_selected_id(&mut self, id: &str) -> Vec<MapCommand> {
        let t = self.reconciler.select(&self.reconciler_state(), &self.index, id);
        let commands = self.commit(t, true);
        self.notify();
        commands
    }

    /// User pan/zoom reported by the engine.
    pub fn on_move(&mut self, longitude: f64, latitude: f64, zoom: f64) {
        self.store
            .borrow_mut()
            .set_camera(longitude, latitude, zoom);
        self.notify();
    }

    pub fn on_drag_start(&mut self) {
        self.store.borrow_mut().set_drag_state(DragState::On);
        self.notify();
    }

    pub fn on_drag_end(&mut self) {
        self.store.borrow_mut().set_drag_state(DragState::Off);
        self.notify();
    }

    /// Sends `commands` to `engine`, ignoring individual failures.
    pub fn execute(&mut self, engine: &mut dyn MapEngine, commands: &[MapCommand]) -> usize {
        execute(engine, commands, &mut self.metrics)
    }

    fn reconciler_state(&self) -> ReconcilerState {
        ReconcilerState {
            selection: self.store.borrow().selection().clone(),
            flags: self.flags,
        }
    }

    fn source_data_command(&self) -> MapCommand {
        MapCommand::SetSourceData {
            source: self.source.clone(),
            data: self.collection.clone(),
        }
    }

    /// Writes a transition back and appends the camera move it implies.
    fn commit(&mut self, t: Transition, follow_selection: bool) -> Vec<MapCommand> {
        let Transition {
            state,
            mut commands,
        } = t;

        let (previous, previous_hover) = {
            let mut store = self.store.borrow_mut();
            let previous = store.selected_id().to_string();
            let previous_hover = store.hover_id().to_string();
            store.set_selected_id(&state.selection.selected_id);
            store.set_hover_id(&state.selection.hover_id);
            (previous, previous_hover)
        };
        self.flags = state.flags;

        if previous != state.selection.selected_id {
            debug!(from = %previous, to = %state.selection.selected_id, "selection changed");
        }
        if previous_hover != state.selection.hover_id {
            debug!(from = %previous_hover, to = %state.selection.hover_id, "hover changed");
        }

        if follow_selection
            && let Some(fly) = self.camera.on_selection_changed(
                &previous,
                &state.selection.selected_id,
                &self.businesses,
            )
        {
            commands.push(self.fly_to(&state.selection.selected_id, fly));
        }

        commands
    }

    /// Moves the store's viewport to the end point of `fly`.
    fn fly_to(&mut self, business: &str, fly: FlyTo) -> MapCommand {
        info!(
            business = %business,
            longitude = fly.center.longitude,
            latitude = fly.center.latitude,
            zoom = fly.zoom,
            "flying to selected business"
        );
        self.store
            .borrow_mut()
            .set_camera(fly.center.longitude, fly.center.latitude, fly.zoom);
        self.metrics.inc_counter("camera.fly_to", 1);
        MapCommand::FlyTo(fly)
    }

    fn notify(&self) {
        ViewStateStore::notify(&self.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::interaction::{MatchedFeature, PointerEventKind};
    use crate::store::{CHANGE_LOG_LIMIT, ViewChange, ViewportState};
    use foundation::coord::LngLat;
    use foundation::ids::FeatureId;
    use layers::{FeatureStateKey, LayerId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn businesses() -> Vec<BusinessRecord> {
        vec![
            BusinessRecord::new("a", "A").with_location(42.0, -71.0),
            BusinessRecord::new("b", "B"),
            BusinessRecord::new("c", "C").with_location(40.0, -74.0),
        ]
    }

    fn config() -> MapConfig {
        MapConfig::default()
    }

    fn session_with(list: Vec<BusinessRecord>) -> (MapViewSession, RecordingEngine) {
        let c = config();
        let store = ViewStateStore::shared(ViewportState::new(c.longitude, c.latitude, c.zoom));
        let mut session = MapViewSession::new(&c, store, list);
        let mut engine = RecordingEngine::new();
        let commands = session.mount();
        session.execute(&mut engine, &commands);
        (session, engine)
    }

    fn hit(session: &MapViewSession, business: &str) -> MatchedFeature {
        let id = session.feature_index().feature_id(business);
        MatchedFeature::new(id, Some(business.to_string()))
    }

    fn run(
        session: &mut MapViewSession,
        engine: &mut RecordingEngine,
        event: &PointerEvent,
    ) -> Vec<MapCommand> {
        let commands = session.handle_pointer(event);
        session.execute(engine, &commands);
        commands
    }

    #[test]
    fn projection_excludes_online_only_businesses() {
        let (session, _) = session_with(vec![
            BusinessRecord::new("a", "A").with_location(42.0, -71.0),
            BusinessRecord::new("b", "B"),
        ]);
        let fc = session.feature_collection();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].properties.id, "a");
        assert_eq!(session.metrics().gauge("map.online_only"), Some(1));
    }

    #[test]
    fn click_selects_and_flies_to_business() {
        let (mut session, mut engine) = session_with(businesses());
        let event = PointerEvent::click(vec![hit(&session, "a")]);
        let commands = run(&mut session, &mut engine, &event);

        let store = session.store();
        assert_eq!(store.borrow().selected_id(), "a");
        let fly = FlyTo {
            center: LngLat::new(-71.0, 42.0),
            zoom: config().business_view_zoom,
            duration_ms: config().transition_duration_ms,
        };
        assert_eq!(commands.last(), Some(&MapCommand::FlyTo(fly)));
        assert_eq!(engine.flights(), &[fly]);

        // Store viewport matches the animation's end point.
        let v = store.borrow().viewport();
        assert_eq!((v.longitude, v.latitude, v.zoom), (-71.0, 42.0, fly.zoom));
    }

    #[test]
    fn hover_moves_between_features_without_overlap() {
        let (mut session, mut engine) = session_with(businesses());
        let a = hit(&session, "a");
        let c = hit(&session, "c");
        run(&mut session, &mut engine, &PointerEvent::enter(vec![a]));
        run(&mut session, &mut engine, &PointerEvent::enter(vec![c.clone()]));

        assert_eq!(
            engine.flagged(&SourceId::MAP, FeatureStateKey::Hover),
            vec![c.feature_id.unwrap()]
        );
        assert_eq!(session.store().borrow().hover_id(), "c");
    }

    #[test]
    fn empty_click_changes_nothing() {
        let (mut session, mut engine) = session_with(businesses());
        let a = hit(&session, "a");
        run(&mut session, &mut engine, &PointerEvent::click(vec![a]));
        let changes_before = session.store().borrow().changes().len();

        let commands = run(&mut session, &mut engine, &PointerEvent::click(vec![]));

        assert!(commands.is_empty());
        assert_eq!(session.store().borrow().selected_id(), "a");
        assert_eq!(session.store().borrow().changes().len(), changes_before);
    }

    #[test]
    fn deselect_clears_flag_without_camera_move() {
        let (mut session, mut engine) = session_with(businesses());
        let commands = session.set_selected_id("a");
        session.execute(&mut engine, &commands);
        let commands = session.set_selected_id("");
        session.execute(&mut engine, &commands);

        assert!(!commands.iter().any(|c| matches!(c, MapCommand::FlyTo(_))));
        assert!(engine.flagged(&SourceId::MAP, FeatureStateKey::Selected).is_empty());
        assert_eq!(engine.flights().len(), 1);
    }

    #[test]
    fn selecting_online_only_business_skips_camera() {
        let (mut session, mut engine) = session_with(businesses());
        let commands = session.set_selected_id("b");
        session.execute(&mut engine, &commands);
        assert!(commands.is_empty());
        assert_eq!(session.store().borrow().selected_id(), "b");
        assert!(engine.flights().is_empty());
    }

    #[test]
    fn initial_viewport_centres_on_preselected_business() {
        let c = config();
        let store = ViewStateStore::shared(ViewportState::new(0.0, 0.0, 1.0));
        store.borrow_mut().set_selected_id("c");
        let mut session = MapViewSession::new(&c, store.clone(), businesses());
        let v = store.borrow().viewport();
        assert_eq!((v.longitude, v.latitude, v.zoom), (-74.0, 40.0, c.zoom));

        let mut engine = RecordingEngine::new();
        let commands = session.mount();
        session.execute(&mut engine, &commands);
        assert_eq!(
            engine.flagged(&SourceId::MAP, FeatureStateKey::Selected),
            vec![FeatureId::new(1)]
        );
        let fly = FlyTo {
            center: LngLat::new(-74.0, 40.0),
            zoom: c.business_view_zoom,
            duration_ms: c.transition_duration_ms,
        };
        assert_eq!(engine.flights(), &[fly]);
        let v = store.borrow().viewport();
        assert_eq!((v.longitude, v.latitude, v.zoom), (-74.0, 40.0, c.business_view_zoom));
    }

    #[test]
    fn mount_without_located_selection_keeps_camera() {
        let c = config();
        let store = ViewStateStore::shared(ViewportState::new(0.0, 0.0, 1.0));
        store.borrow_mut().set_selected_id("b");
        let mut session = MapViewSession::new(&c, store.clone(), businesses());
        let commands = session.mount();
        assert!(!commands.iter().any(|c| matches!(c, MapCommand::FlyTo(_))));
        assert_eq!(store.borrow().viewport().zoom, c.zoom);
    }

    #[test]
    fn selected_business_gaining_a_location_gets_camera_move() {
        let (mut session, mut engine) = session_with(businesses());
        let commands = session.set_selected_id("b");
        session.execute(&mut engine, &commands);
        assert!(engine.flights().is_empty());

        let commands = session.set_businesses(vec![
            BusinessRecord::new("b", "B").with_location(41.0, -72.0),
        ]);
        session.execute(&mut engine, &commands);

        assert_eq!(
            engine.flagged(&SourceId::MAP, FeatureStateKey::Selected),
            vec![FeatureId::new(0)]
        );
        assert_eq!(engine.flights().len(), 1);
        assert_eq!(engine.flights()[0].center, LngLat::new(-72.0, 41.0));
        assert_eq!(session.store().borrow().viewport().zoom, config().business_view_zoom);
    }

    #[test]
    fn subscribers_read_the_store_during_notification() {
        let (mut session, mut engine) = session_with(businesses());
        let store = session.store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handle = Rc::downgrade(&store);
        store.borrow_mut().subscribe(move |e| {
            let store = handle.upgrade().expect("store alive");
            let readable = store.try_borrow().is_ok();
            sink.borrow_mut().push((e.payload.clone(), readable));
        });

        let commands = session.set_selected_id("a");
        session.execute(&mut engine, &commands);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(_, readable)| *readable));
        assert!(matches!(seen[0].0, ViewChange::Selected { .. }));
        assert!(matches!(seen[1].0, ViewChange::Camera { .. }));
    }

    #[test]
    fn panning_keeps_the_change_log_bounded() {
        let (mut session, _) = session_with(businesses());
        for i in 0..(CHANGE_LOG_LIMIT * 3) {
            session.on_move(i as f64 * 1e-6, 1.0, 12.0);
        }
        assert_eq!(session.store().borrow().changes().len(), CHANGE_LOG_LIMIT);
    }

    #[test]
    fn reprojection_moves_selected_flag() {
        let (mut session, mut engine) = session_with(businesses());
        let commands = session.set_selected_id("c");
        session.execute(&mut engine, &commands);
        assert_eq!(
            engine.flagged(&SourceId::MAP, FeatureStateKey::Selected),
            vec![FeatureId::new(1)]
        );

        // New search result: only "c" remains and becomes feature 0.
        let commands =
            session.set_businesses(vec![BusinessRecord::new("c", "C").with_location(40.0, -74.0)]);
        session.execute(&mut engine, &commands);

        assert_eq!(
            engine.flagged(&SourceId::MAP, FeatureStateKey::Selected),
            vec![FeatureId::new(0)]
        );
        assert!(!commands.iter().any(|c| matches!(c, MapCommand::FlyTo(_))));
        assert_eq!(session.metrics().counter("map.reprojections"), 1);
    }

    #[test]
    fn stale_hover_after_reprojection_is_inert() {
        let (mut session, mut engine) = session_with(businesses());
        let a = hit(&session, "a");
        run(&mut session, &mut engine, &PointerEvent::enter(vec![a]));

        let commands = session.set_businesses(vec![BusinessRecord::new("z", "Z")]);
        session.execute(&mut engine, &commands);
        let commands = run(&mut session, &mut engine, &PointerEvent::leave());

        assert_eq!(session.store().borrow().hover_id(), "");
        assert!(engine.flagged(&SourceId::MAP, FeatureStateKey::Hover).is_empty());
        assert!(
            !commands
                .iter()
                .any(|c| matches!(c, MapCommand::ClearFeatureState { .. }))
        );
    }

    #[test]
    fn drag_and_move_update_viewport() {
        let (mut session, _) = session_with(businesses());
        session.on_drag_start();
        session.on_move(1.0, 2.0, 3.0);
        let v = session.store().borrow().viewport();
        assert_eq!(v.drag, DragState::On);
        assert_eq!((v.longitude, v.latitude, v.zoom), (1.0, 2.0, 3.0));
        session.on_drag_end();
        assert_eq!(session.store().borrow().drag_state(), DragState::Off);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Click(Option<usize>),
        Enter(usize),
        Leave,
        Select(Option<usize>),
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            proptest::option::of(0usize..4).prop_map(Step::Click),
            (0usize..4).prop_map(Step::Enter),
            Just(Step::Leave),
            proptest::option::of(0usize..4).prop_map(Step::Select),
        ]
    }

    const IDS: [&str; 4] = ["a", "b", "c", "d"];

    fn apply(session: &mut MapViewSession, engine: &mut RecordingEngine, step: &Step) -> Vec<MapCommand> {
        let commands = match step {
            Step::Click(None) => session.handle_pointer(&PointerEvent::click(vec![])),
            Step::Click(Some(i)) => {
                let m = hit(session, IDS[*i]);
                session.handle_pointer(&PointerEvent::click(vec![m]))
            }
            Step::Enter(i) => {
                let m = hit(session, IDS[*i]);
                session.handle_pointer(&PointerEvent::new(PointerEventKind::Enter, LayerId::BUSINESSES, vec![m]))
            }
            Step::Leave => session.handle_pointer(&PointerEvent::leave()),
            Step::Select(None) => session.set_selected_id(""),
            Step::Select(Some(i)) => session.set_selected_id(IDS[*i]),
        };
        session.execute(engine, &commands);
        commands
    }

    fn four_businesses() -> Vec<BusinessRecord> {
        vec![
            BusinessRecord::new("a", "A").with_location(42.0, -71.0),
            BusinessRecord::new("b", "B"),
            BusinessRecord::new("c", "C").with_location(40.0, -74.0),
            BusinessRecord::new("d", "D").with_location(41.0, -73.0),
        ]
    }

    proptest! {
        /// Property: at most one feature carries the selected flag, and it
        /// is the feature of the selected business.
        #[test]
        fn prop_selected_flag_is_exclusive(steps in proptest::collection::vec(arb_step(), 0..30)) {
            let (mut session, mut engine) = session_with(four_businesses());
            for step in &steps {
                apply(&mut session, &mut engine, step);
                let flagged = engine.flagged(&SourceId::MAP, FeatureStateKey::Selected);
                let selected = session.store().borrow().selected_id().to_string();
                let expected: Vec<FeatureId> =
                    session.feature_index().feature_id(&selected).into_iter().collect();
                prop_assert_eq!(flagged, expected);
                let hovered = engine.flagged(&SourceId::MAP, FeatureStateKey::Hover);
                prop_assert!(hovered.len() <= 1);
            }
        }

        /// Property: enter followed by leave clears the hover flag and id.
        #[test]
        fn prop_leave_clears_hover(
            steps in proptest::collection::vec(arb_step(), 0..20),
            target in 0usize..4,
        ) {
            let (mut session, mut engine) = session_with(four_businesses());
            for step in &steps {
                apply(&mut session, &mut engine, step);
            }
            apply(&mut session, &mut engine, &Step::Enter(target));
            apply(&mut session, &mut engine, &Step::Leave);
            let hover = session.store().borrow().hover_id().to_string();
            prop_assert_eq!(hover.as_str(), "");
            prop_assert!(engine.flagged(&SourceId::MAP, FeatureStateKey::Hover).is_empty());
        }

        /// Property: deselecting never issues a camera transition.
        #[test]
        fn prop_deselect_never_flies(steps in proptest::collection::vec(arb_step(), 0..20)) {
            let (mut session, mut engine) = session_with(four_businesses());
            for step in &steps {
                apply(&mut session, &mut engine, step);
            }
            let commands = apply(&mut session, &mut engine, &Step::Select(None));
            prop_assert!(!commands.iter().any(|c| matches!(c, MapCommand::FlyTo(_))));
        }
    }
}
