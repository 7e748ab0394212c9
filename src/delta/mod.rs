//! Change tracking: diffs between record snapshots, path-addressed assignment,
//! and reconciliation of external representations.

mod absorb;
mod apply;
mod diff;
mod types;

pub use absorb::absorb;
pub use apply::{apply_parsed, apply_path, apply_path_with, resolve};
pub use diff::diff;
pub use types::Delta;
