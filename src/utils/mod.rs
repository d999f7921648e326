//! Utils Module
pub mod truncate;

pub use truncate::{preview_json, truncate_text};
