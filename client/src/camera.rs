use listing_map_shared::LatLng;
use tracing::debug;

use crate::provider::{CameraPose, MapProvider};

/// Camera moves on behalf of listings, plus the single pending hover revert target.
#[derive(Debug, Default)]
pub struct CameraController {
    snapshot: Option<CameraPose>,
    /// Programmatic eases not yet followed by an idle.
    unsettled_eases: u32,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<CameraPose> {
        self.snapshot
    }

    /// Center the camera on `target`. Eased moves keep the current zoom.
    ///
    /// A direct pan re-centers the map for good, so any pending hover revert is dropped along
    /// with it.
    pub fn pan_to<M: MapProvider + ?Sized>(&mut self, map: &mut M, target: LatLng, use_ease: bool) {
        if use_ease {
            let pose = CameraPose {
                center: target,
                zoom: map.zoom(),
            };
            self.unsettled_eases += 1;
            map.ease_to(pose);
        } else {
            if self.snapshot.take().is_some() {
                debug!("hover snapshot dropped by direct pan");
            }
            self.unsettled_eases = 0;
            map.pan_to(target);
        }
    }

    /// Capture the camera unless a snapshot is already held, then ease toward `target`.
    pub fn begin_hover_pan<M: MapProvider + ?Sized>(&mut self, map: &mut M, target: LatLng) {
        if self.snapshot.is_none() {
            let pose = map.camera();
            debug!(lat = pose.center.lat, lng = pose.center.lng, zoom = pose.zoom, "captured hover snapshot");
            self.snapshot = Some(pose);
        }
        self.pan_to(map, target, true);
    }

    /// Restore the captured camera exactly and drop the snapshot. No-op without one.
    pub fn end_hover_pan<M: MapProvider + ?Sized>(&mut self, map: &mut M) {
        let Some(pose) = self.snapshot.take() else {
            return;
        };
        self.unsettled_eases += 1;
        map.ease_to(pose);
    }

    /// The user took over the camera: forget the revert target without moving.
    pub fn user_gesture(&mut self) {
        if self.snapshot.take().is_some() {
            debug!("hover snapshot dropped by user gesture");
        }
        self.unsettled_eases = 0;
    }

    /// Map reached idle. An idle that settles our own ease keeps the snapshot; any other idle is
    /// a structural viewport change and drops it.
    pub fn on_idle(&mut self) {
        if self.unsettled_eases > 0 {
            self.unsettled_eases = 0;
            return;
        }
        if self.snapshot.take().is_some() {
            debug!("hover snapshot invalidated by viewport change");
        }
    }
}
