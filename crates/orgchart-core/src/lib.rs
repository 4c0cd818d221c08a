#![forbid(unsafe_code)]

//! Org chart records, tree builder and snapshot diff (headless).
//!
//! The crate covers everything up to (but excluding) geometry:
//! - [`record`]: tolerant loading of `name → { level, under, position, lineType }` documents
//! - [`tree`]: linking flat records into a rooted tree
//! - [`diff`]: labeling a target snapshot relative to a base snapshot
//! - [`index`]: the multi-diagram index
//! - [`portal`]: the project portal catalog
//!
//! Layout and rendering live in `orgchart-render`.

pub mod config;
pub mod diff;
pub mod error;
pub mod index;
pub mod portal;
pub mod record;
pub mod tree;

pub use config::{ChartConfig, ExportConfig, LayoutConfig, TreeConfig, ViewportConfig};
pub use diff::{DiffLabel, DiffReport, DiffSummary, DiffVocabulary, diff};
pub use error::{Error, Result};
pub use index::{DiagramEntry, DiagramIndex, ResolvedDiagram};
pub use record::{Document, LineType, Record};
pub use tree::{Node, NodeId, OrgTree, RootPolicy};

/// Loads a document and builds its tree using the root policy from `config`.
pub fn build_tree(doc: &Document, config: &ChartConfig) -> Result<OrgTree> {
    OrgTree::build_with_policy(doc, config.tree()?.root_policy)
}
