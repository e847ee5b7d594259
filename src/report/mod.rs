//! Output rendering.

pub mod generator;

pub use generator::{render_detail, render_history};
