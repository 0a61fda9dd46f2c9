//! Chart panes, layout and the primary -> secondary viewport alignment.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{ChartGeometry, PaneSize, PriceRange, Timeframe, Viewport};
use crate::error::{ReplayError, ReplayResult};
use crate::interaction::PaneTransform;

/// Six hours.
pub const DEFAULT_SECONDARY_WINDOW_SECONDS: i64 = 6 * 60 * 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Single,
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneId {
    Primary,
    Secondary,
}

/// Who caused a viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportChangeOrigin {
    User,
    Synchronizer,
}

/// Per-pane view state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaneState {
    pub timeframe: Timeframe,
    pub viewport: Option<Viewport>,
    pub geometry: ChartGeometry,
}

impl PaneState {
    #[must_use]
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            viewport: None,
            geometry: ChartGeometry::new(PaneSize::new(0, 0), PriceRange::new(0.0, 0.0)),
        }
    }

    /// Transform for decoding pointer input; `None` until a viewport is set.
    #[must_use]
    pub fn transform(&self) -> Option<PaneTransform> {
        self.viewport
            .map(|viewport| PaneTransform::new(viewport, self.geometry))
    }
}

/// One-shot alignment of the secondary pane onto the primary pane's right edge.
///
/// Alignment raises `syncing`; the viewport-change echo it causes is consumed
/// by [`DualPaneSynchronizer::observe_secondary_change`] instead of being
/// treated as user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualPaneSynchronizer {
    window_seconds: i64,
    syncing: bool,
}

impl Default for DualPaneSynchronizer {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_SECONDARY_WINDOW_SECONDS,
            syncing: false,
        }
    }
}

impl DualPaneSynchronizer {
    pub fn new(window_seconds: i64) -> ReplayResult<Self> {
        if window_seconds <= 0 {
            return Err(ReplayError::InvalidData(
                "secondary window must be > 0 seconds".to_owned(),
            ));
        }
        Ok(Self {
            window_seconds,
            syncing: false,
        })
    }

    #[must_use]
    pub fn window_seconds(&self) -> i64 {
        self.window_seconds
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Secondary viewport `[primary.to - window, primary.to]`.
    pub fn align(&mut self, primary: Viewport) -> Viewport {
        self.syncing = true;
        let aligned = Viewport::ending_at(primary.to, self.window_seconds);
        trace!(from = aligned.from, to = aligned.to, "aligned secondary pane");
        aligned
    }

    pub fn observe_secondary_change(&mut self) -> ViewportChangeOrigin {
        if self.syncing {
            self.syncing = false;
            ViewportChangeOrigin::Synchronizer
        } else {
            ViewportChangeOrigin::User
        }
    }
}

/// Both panes plus the layout switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneSet {
    layout: Layout,
    primary: PaneState,
    secondary: PaneState,
    synchronizer: DualPaneSynchronizer,
}

impl PaneSet {
    #[must_use]
    pub fn new(
        primary: Timeframe,
        secondary: Timeframe,
        synchronizer: DualPaneSynchronizer,
    ) -> Self {
        Self {
            layout: Layout::Single,
            primary: PaneState::new(primary),
            secondary: PaneState::new(secondary),
            synchronizer,
        }
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub fn pane(&self, id: PaneId) -> &PaneState {
        match id {
            PaneId::Primary => &self.primary,
            PaneId::Secondary => &self.secondary,
        }
    }

    fn pane_mut(&mut self, id: PaneId) -> &mut PaneState {
        match id {
            PaneId::Primary => &mut self.primary,
            PaneId::Secondary => &mut self.secondary,
        }
    }

    #[must_use]
    pub fn synchronizer(&self) -> &DualPaneSynchronizer {
        &self.synchronizer
    }

    pub fn set_geometry(&mut self, id: PaneId, geometry: ChartGeometry) {
        self.pane_mut(id).geometry = geometry;
    }

    fn align_secondary(&mut self) -> Option<Viewport> {
        let primary = self.primary.viewport?;
        let aligned = self.synchronizer.align(primary);
        self.secondary.viewport = Some(aligned);
        Some(aligned)
    }

    /// Switches layout; entering split aligns the secondary pane once.
    pub fn set_layout(&mut self, layout: Layout) -> Option<Viewport> {
        let previous = self.layout;
        self.layout = layout;
        if previous == Layout::Single && layout == Layout::Split {
            return self.align_secondary();
        }
        None
    }

    /// Re-aggregation event: realigns when split.
    pub fn set_secondary_timeframe(&mut self, timeframe: Timeframe) -> Option<Viewport> {
        if self.secondary.timeframe == timeframe {
            return None;
        }
        self.secondary.timeframe = timeframe;
        if self.layout == Layout::Split {
            return self.align_secondary();
        }
        None
    }

    pub fn set_primary_timeframe(&mut self, timeframe: Timeframe) {
        self.primary.timeframe = timeframe;
    }

    /// Records a viewport change reported by a pane.
    ///
    /// Primary changes do not propagate to the secondary pane, except for the
    /// first primary viewport of a session that starts split.
    pub fn on_viewport_changed(&mut self, id: PaneId, viewport: Viewport) -> ViewportChangeOrigin {
        self.pane_mut(id).viewport = Some(viewport);
        match id {
            PaneId::Primary => {
                if self.layout == Layout::Split && self.secondary.viewport.is_none() {
                    self.align_secondary();
                }
                ViewportChangeOrigin::User
            }
            PaneId::Secondary => self.synchronizer.observe_secondary_change(),
        }
    }
}
