//! Transient interaction session state.
//!
//! One [`Session`] exists per engine. It is created at engine start, reset
//! to `Idle` on deselection, and never persisted.

use ob_canvas::ShapeHandle;
use ob_canvas::overlay::OverlayPlacement;
use ob_core::ObstacleId;
use ob_core::model::{Color, Obstacle, Point};

/// Where the pointer state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    /// A draw gesture is in progress. The draft shape materializes only
    /// after the pointer has travelled past the drag threshold; until
    /// then `draft` is `None` and releasing the pointer is just a click.
    Drawing {
        anchor: Point,
        draft: Option<ShapeHandle>,
        color: Color,
    },
    /// A shape is being moved natively by the backend.
    Dragging {
        id: ObstacleId,
        handle: ShapeHandle,
    },
    Selected {
        id: ObstacleId,
    },
}

impl InteractionState {
    /// The obstacle the session is acting on, if any.
    pub fn active_id(&self) -> Option<ObstacleId> {
        match *self {
            InteractionState::Dragging { id, .. } | InteractionState::Selected { id } => Some(id),
            _ => None,
        }
    }
}

/// Edit-form data contract: the snapshot taken when the form opened, for
/// cancel-reverts. Field changes stream back in as patches and are
/// applied, never validated here.
#[derive(Debug, Clone, PartialEq)]
pub struct EditFormSession {
    pub obstacle_id: ObstacleId,
    pub original_values: Obstacle,
}

#[derive(Debug)]
pub struct Session {
    pub state: InteractionState,
    pub edit_form: Option<EditFormSession>,
    pub overlay: Option<OverlayPlacement>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
            edit_form: None,
            overlay: None,
        }
    }

    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.edit_form = None;
        self.overlay = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Yes/no capability consulted before a destructive delete. Injected at
/// engine construction; tests pass an auto-confirming closure.
pub trait ConfirmDelete {
    fn confirm(&mut self, id: ObstacleId) -> bool;
}

impl<F: FnMut(ObstacleId) -> bool> ConfirmDelete for F {
    fn confirm(&mut self, id: ObstacleId) -> bool {
        self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_id_only_in_dragging_and_selected() {
        let id = ObstacleId::from_raw(3);
        assert_eq!(InteractionState::Idle.active_id(), None);
        assert_eq!(
            InteractionState::Drawing {
                anchor: Point::new(0.0, 0.0),
                draft: None,
                color: Color::rgb(0, 0, 0),
            }
            .active_id(),
            None
        );
        assert_eq!(InteractionState::Selected { id }.active_id(), Some(id));
    }

    #[test]
    fn closures_satisfy_the_confirmation_capability() {
        let mut always = |_: ObstacleId| true;
        assert!(always.confirm(ObstacleId::from_raw(1)));
    }
}
