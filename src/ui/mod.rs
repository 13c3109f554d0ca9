//! Terminal timeline viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: viewer state, keyboard event loop, pane focus and playback
//! - **[`panes`]**: render functions for each visible pane (grid, variables,
//!   source, output, status bar)
//! - **[`theme`]**: the colour palette shared by all panes
//!
//! Construct an [`App`] from a recorded [`TimelineDelta`] and call
//! [`App::run`] to start the event loop. Frames are rebuilt on demand with
//! [`TimelineDelta::reconstruct_snapshot`].
//!
//! [`TimelineDelta`]: crate::snapshot::TimelineDelta
//! [`TimelineDelta::reconstruct_snapshot`]: crate::snapshot::TimelineDelta::reconstruct_snapshot
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
