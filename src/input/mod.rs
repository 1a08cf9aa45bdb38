//! Input module - pointer events, display-to-image mapping and the stroke
//! state machine

mod controller;
mod coordinate_mapper;

pub use controller::{
    paint_gate, ControllerState, InputController, PaintTarget, Refusal, StrokeAction,
    StrokeSession,
};
pub use coordinate_mapper::{to_image_space, CoordinateMapper};

use serde::{Deserialize, Serialize};

/// Raw pointer event delivered by the host.
///
/// `Down` comes from the canvas itself and carries the offset within the
/// canvas. `Move` and `Up` are document-level and only carry page
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        offset_x: f32,
        offset_y: f32,
        page_x: f32,
        page_y: f32,
    },
    Move {
        page_x: f32,
        page_y: f32,
    },
    Up {
        page_x: f32,
        page_y: f32,
    },
}

impl PointerEvent {
    /// Down event for a canvas placed at the page origin
    pub fn down_at(x: f32, y: f32) -> Self {
        PointerEvent::Down {
            offset_x: x,
            offset_y: y,
            page_x: x,
            page_y: y,
        }
    }

    pub fn move_to(page_x: f32, page_y: f32) -> Self {
        PointerEvent::Move { page_x, page_y }
    }

    pub fn up_at(page_x: f32, page_y: f32) -> Self {
        PointerEvent::Up { page_x, page_y }
    }
}
