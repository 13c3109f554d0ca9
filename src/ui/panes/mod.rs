//! UI pane rendering modules
//!
//! Each pane is a free `render_*` function taking the frame, its area and
//! the data it draws, plus a mutable scroll offset it clamps in place.

pub mod grid;
pub mod log;
pub mod source;
pub mod status;
pub mod variables;

pub use grid::{render_grid_pane, GridScroll};
pub use log::render_log_pane;
pub use source::render_source_pane;
pub use status::{render_status_bar, TimelinePosition};
pub use variables::render_variables_pane;
