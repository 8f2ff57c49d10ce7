use catalog::{BusinessRecord, find_business_by_id};
use foundation::coord::LngLat;
use foundation::ids::is_unset_id;
use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::store::ViewportState;

/// Animated camera transition. A later fly-to interrupts an earlier one.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyTo {
    pub center: LngLat,
    pub zoom: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraController {
    business_view_zoom: f64,
    transition_duration_ms: u64,
}

impl CameraController {
    pub fn new(business_view_zoom: f64, transition_duration_ms: u64) -> Self {
        Self {
            business_view_zoom,
            transition_duration_ms,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.business_view_zoom, config.transition_duration_ms)
    }

    /// Camera move for a selection change from `previous` to `selected`.
    ///
    /// Returns `None` when the selection was cleared or did not change, or
    /// when the selected business is unknown or has no location.
    pub fn on_selection_changed(
        &self,
        previous: &str,
        selected: &str,
        businesses: &[BusinessRecord],
    ) -> Option<FlyTo> {
        if is_unset_id(selected) || selected == previous {
            return None;
        }
        let business = find_business_by_id(businesses, selected)?;
        self.target_for(business)
    }

    /// Camera move for the selection already in place when the map mounts.
    pub fn on_mount(&self, selected: &str, businesses: &[BusinessRecord]) -> Option<FlyTo> {
        let business = find_business_by_id(businesses, selected)?;
        self.target_for(business)
    }

    /// Camera move when a new business list arrives under an unchanged
    /// selection: only when the selected business had no location in
    /// `before` and has one in `after`.
    pub fn on_businesses_changed(
        &self,
        selected: &str,
        before: &[BusinessRecord],
        after: &[BusinessRecord],
    ) -> Option<FlyTo> {
        let was_located = find_business_by_id(before, selected)
            .and_then(BusinessRecord::coordinate)
            .is_some();
        if was_located {
            return None;
        }
        self.on_mount(selected, after)
    }

    pub fn target_for(&self, business: &BusinessRecord) -> Option<FlyTo> {
        let center = business.coordinate()?;
        Some(FlyTo {
            center,
            zoom: self.business_view_zoom,
            duration_ms: self.transition_duration_ms,
        })
    }
}

/// Viewport shown when the map first mounts: centred on the selected
/// business if it has a location, otherwise on the configured default.
pub fn initial_viewport(config: &MapConfig, selected: Option<&BusinessRecord>) -> ViewportState {
    let center = selected
        .and_then(BusinessRecord::coordinate)
        .unwrap_or(LngLat::new(config.longitude, config.latitude));
    ViewportState::new(center.longitude, center.latitude, config.zoom)
}
