//! Markdown-to-slide-image rendering.
//!
//! Decks are rendered with the marp CLI, which drives a headless Chromium.
//! That makes it the flakiest tool in the pipeline, so the renderer exposes
//! a defensive invocation mode (sandbox disabled, reduced scale) that the
//! render stage tries before degrading to placeholder imagery.

mod config;
mod deck;
mod engine;
mod error;
mod marp;

pub use config::RendererConfig;
pub use deck::{count_slides, ensure_front_matter};
pub use engine::{RenderMode, SlideRenderer};
pub use error::RendererError;
pub use marp::MarpRenderer;
