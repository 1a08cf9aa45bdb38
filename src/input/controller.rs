//! Stroke state machine - turns pointer events into stamps on the active raster

use super::CoordinateMapper;
use crate::brush::{points_between, Brush};
use crate::dataset::Feature;
use crate::raster::AnnotationRaster;

/// Why a pointer event could not paint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Busy,
    NoActiveFeature,
    NotHeatmap,
    RasterUnallocated,
    NoBrush,
    NoDisplaySize,
}

/// Everything a stamp needs, borrowed for the duration of one event
#[derive(Debug)]
pub struct PaintTarget<'a> {
    pub raster: &'a mut AnnotationRaster,
    pub brush: &'a Brush,
    pub mapper: CoordinateMapper,
}

/// Check the painting preconditions and borrow the target if they hold
pub fn paint_gate<'a>(
    busy: bool,
    feature: Option<&'a mut Feature>,
    brush: Option<&'a Brush>,
    mapper: Option<CoordinateMapper>,
) -> Result<PaintTarget<'a>, Refusal> {
    if busy {
        return Err(Refusal::Busy);
    }
    let feature = feature.ok_or(Refusal::NoActiveFeature)?;
    let raster = feature.heatmap_mut().ok_or(Refusal::NotHeatmap)?;
    if !raster.is_allocated() {
        return Err(Refusal::RasterUnallocated);
    }
    let brush = brush.ok_or(Refusal::NoBrush)?;
    let mapper = mapper.ok_or(Refusal::NoDisplaySize)?;
    Ok(PaintTarget {
        raster,
        brush,
        mapper,
    })
}

/// One pointer-down to pointer-up drag.
///
/// Holding a session is what keeps document-level move/up events routed to
/// the controller; dropping it releases that routing.
#[derive(Debug)]
pub struct StrokeSession {
    id: u64,
    /// `offset - page` captured at pointer down
    page_offset: (f32, f32),
    last_point: (f32, f32),
    stamps: usize,
}

impl StrokeSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Last stamped point in image space
    pub fn last_point(&self) -> (f32, f32) {
        self.last_point
    }

    pub fn stamps(&self) -> usize {
        self.stamps
    }
}

impl Drop for StrokeSession {
    fn drop(&mut self) {
        tracing::debug!("Stroke {} released after {} stamps", self.id, self.stamps);
    }
}

#[derive(Debug, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Painting(StrokeSession),
}

/// Result of feeding one pointer event to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeAction {
    /// Event not relevant in the current state
    Ignored,
    /// Preconditions failed; nothing changed
    Refused(Refusal),
    Started { stroke_id: u64, stamps: usize },
    Continued { stroke_id: u64, stamps: usize },
    Ended { stroke_id: u64 },
}

impl StrokeAction {
    /// Whether the raster was modified
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            StrokeAction::Started { stamps, .. } | StrokeAction::Continued { stamps, .. }
                if *stamps > 0
        )
    }
}

#[derive(Debug)]
pub struct InputController {
    state: ControllerState,
    next_stroke_id: u64,
}

impl InputController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            next_stroke_id: 1,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_painting(&self) -> bool {
        matches!(self.state, ControllerState::Painting(_))
    }

    pub fn session(&self) -> Option<&StrokeSession> {
        match &self.state {
            ControllerState::Painting(session) => Some(session),
            ControllerState::Idle => None,
        }
    }

    fn alloc_stroke_id(&mut self) -> u64 {
        let stroke_id = self.next_stroke_id;
        self.next_stroke_id = self.next_stroke_id.saturating_add(1);
        stroke_id
    }

    /// Idle -> Painting. Stamps once at the seed point.
    pub fn pointer_down(
        &mut self,
        offset: (f32, f32),
        page: (f32, f32),
        gate: Result<PaintTarget<'_>, Refusal>,
    ) -> StrokeAction {
        if self.is_painting() {
            return StrokeAction::Ignored;
        }
        let target = match gate {
            Ok(target) => target,
            Err(refusal) => {
                tracing::trace!("Pointer down refused: {:?}", refusal);
                return StrokeAction::Refused(refusal);
            }
        };

        let seed = target.mapper.map(offset.0, offset.1);
        let stamps = usize::from(target.raster.stamp(target.brush, seed.0, seed.1));
        let id = self.alloc_stroke_id();
        tracing::debug!("Stroke {} started at ({:.1}, {:.1})", id, seed.0, seed.1);

        self.state = ControllerState::Painting(StrokeSession {
            id,
            page_offset: (offset.0 - page.0, offset.1 - page.1),
            last_point: seed,
            stamps,
        });
        StrokeAction::Started {
            stroke_id: id,
            stamps,
        }
    }

    /// Painting -> Painting. Fills the gap between the last point and the
    /// new one with stamps spaced half a brush width apart.
    pub fn pointer_move(
        &mut self,
        page: (f32, f32),
        gate: Result<PaintTarget<'_>, Refusal>,
    ) -> StrokeAction {
        let ControllerState::Painting(session) = &mut self.state else {
            return StrokeAction::Ignored;
        };
        let target = match gate {
            Ok(target) => target,
            Err(refusal) => {
                tracing::trace!("Stroke {} move dropped: {:?}", session.id, refusal);
                return StrokeAction::Refused(refusal);
            }
        };

        let next = target.mapper.map(
            page.0 + session.page_offset.0,
            page.1 + session.page_offset.1,
        );
        let (x0, y0) = session.last_point;

        let mut stamps = 0;
        let mut points = points_between(x0, y0, next.0, next.1, target.brush.stroke_step());
        for (x, y) in points.by_ref() {
            if target.raster.stamp(target.brush, x, y) {
                stamps += 1;
            }
        }
        if !points.reached_end() && target.raster.stamp(target.brush, next.0, next.1) {
            stamps += 1;
        }

        tracing::trace!(
            "Stroke {} ({:.1}, {:.1}) -> ({:.1}, {:.1}): {} stamps",
            session.id,
            x0,
            y0,
            next.0,
            next.1,
            stamps
        );

        session.last_point = next;
        session.stamps += stamps;
        StrokeAction::Continued {
            stroke_id: session.id,
            stamps,
        }
    }

    /// Painting -> Idle
    pub fn pointer_up(&mut self) -> StrokeAction {
        match std::mem::take(&mut self.state) {
            ControllerState::Painting(session) => StrokeAction::Ended {
                stroke_id: session.id,
            },
            ControllerState::Idle => StrokeAction::Ignored,
        }
    }

    /// Release any open stroke. Returns true if one was open.
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            ControllerState::Painting(session) => {
                tracing::debug!("Stroke {} cancelled", session.id);
                true
            }
            ControllerState::Idle => false,
        }
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}
