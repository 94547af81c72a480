//! Data models for the diagnosis workflow
//!
//! Each sub-module covers one stage: the selected upload, the normalized diagnosis,
//! the recorded history entry and the notifications shown to the user.

mod diagnosis;
mod history;
mod notice;
mod upload;

pub use diagnosis::*;
pub use history::*;
pub use notice::*;
pub use upload::*;
