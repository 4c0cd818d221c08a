#![forbid(unsafe_code)]

//! Geometry and drawing for org charts: layout, scene graph, SVG serialization and the pan/zoom
//! view transform.

pub mod layout;
pub mod model;
pub mod scene;
pub mod svg;
pub mod text;
pub mod viewport;

pub use layout::layout_tree;
pub use model::{Bounds, SceneConnector, SceneGraph, SceneNode, ScenePoint};
pub use scene::{SceneOptions, SearchResult, SearchState, render_scene};
pub use svg::{SvgRenderOptions, render_scene_svg};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};
pub use viewport::{TouchPoint, ViewTransform, ViewportTransform};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("org tree has no root; nothing to lay out")]
    EmptyTree,
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
