//! djvused integration.
//!
//! [`ToolHandle`] finds and validates the executable once; [`StreamEditor`]
//! batches commands and runs them in one djvused process per commit.

mod editor;
mod tool;

pub use editor::StreamEditor;
pub use tool::{pkg_config_variable, resolve_djvused, ToolHandle, USAGE_EXIT_STATUS};
