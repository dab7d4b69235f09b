//! Pointer-driven editing of the weekly grid.
//!
//! Each controller owns its own in-flight gesture; nothing here is shared
//! process-wide and nothing outlives the gesture that created it.

pub mod drag;
pub mod drag_create;
pub mod resize;
pub mod time_grid;
pub mod validator;

pub use drag::{DragContext, DragManager, DropTarget, MoveCommit, MoveEngine, MoveRejection};
pub use drag_create::{DragCreateController, DraftSelection, DraftStart};
pub use resize::{HandleRects, ResizeCommit, ResizeHandle, ResizeManager, ResizeRejection};
pub use time_grid::TimeGrid;
pub use validator::{overlaps, EditKind, Interval, IntervalValidator, Rejection};
