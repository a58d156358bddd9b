//! Shared utility functions.

mod html;

pub use html::{body_text, visible_text};
