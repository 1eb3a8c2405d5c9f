//! State module for tracking traversal progress
//!
//! # Components
//!
//! - `WalkState`: The chapter walker's state machine (fetching, extracting navigation, following, done)

mod walk_state;

// Re-export main types
pub use walk_state::WalkState;
