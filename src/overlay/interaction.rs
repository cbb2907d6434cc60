//! Drag and resize handling for overlay widgets
//!
//! Pointer positions are in frame coordinates, the same space widget
//! geometry is reported in. Nothing here touches the overlay's PDF
//! rectangle; that only changes on commit.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, ScreenRect};

/// Size limits and grab area shared by every overlay widget
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionLimits {
    pub min_width: f64,
    pub min_height: f64,
    /// Side of the bottom-right square that starts a resize
    pub resize_border: f64,
}

impl Default for InteractionLimits {
    fn default() -> Self {
        Self {
            min_width: 30.0,
            min_height: 20.0,
            resize_border: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    /// Pointer position of the previous press or motion event
    Dragging { last: Point },
    Resizing,
}

impl Interaction {
    /// State entered by a press at `pointer` on a widget at `widget`
    #[must_use]
    pub fn press(widget: ScreenRect, pointer: Point, limits: &InteractionLimits) -> Self {
        let local_x = pointer.x - widget.x;
        let local_y = pointer.y - widget.y;
        let border = limits.resize_border;

        if local_x >= widget.width - border && local_y >= widget.height - border {
            Interaction::Resizing
        } else {
            Interaction::Dragging { last: pointer }
        }
    }

    /// New widget geometry for a pointer motion, `None` while idle
    pub fn motion(
        &mut self,
        widget: ScreenRect,
        pointer: Point,
        limits: &InteractionLimits,
    ) -> Option<ScreenRect> {
        match self {
            Interaction::Idle => None,
            Interaction::Dragging { last } => {
                let moved = widget.translate(pointer.x - last.x, pointer.y - last.y);
                *last = pointer;
                Some(moved)
            }
            Interaction::Resizing => Some(
                ScreenRect::new(
                    widget.x,
                    widget.y,
                    pointer.x - widget.x,
                    pointer.y - widget.y,
                )
                .at_least(limits.min_width, limits.min_height),
            ),
        }
    }

    pub fn release(&mut self) {
        *self = Interaction::Idle;
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}
