//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `explain` - Root-cause clustering for one account
//! - `margin` - Contribution margin cascade and drill-down
//! - `rollup` - Revenue and cascade per dimension value
//! - `shared` - Config resolution and export loading helpers
//! - `variance` - Three-way plan/actual reconciliation

pub mod explain;
pub mod margin;
pub mod rollup;
pub mod shared;
pub mod variance;

// Re-export command functions for main.rs
pub use explain::*;
pub use margin::*;
pub use rollup::*;
pub use shared::*;
pub use variance::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
