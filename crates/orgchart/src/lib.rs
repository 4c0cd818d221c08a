#![forbid(unsafe_code)]

//! `orgchart` turns flat `name → { level, under, position, lineType }` records into an org chart.
//!
//! The headless core (records, tree builder, diff, diagram index, project portal) is always
//! available and re-exported at the crate root.
//!
//! # Features
//!
//! - `render`: layout, scene graph, SVG output and the interactive session (`orgchart::render`)
//! - `raster`: PNG/JPG/PDF export via pure-Rust SVG rasterization, with font inlining

pub use orgchart_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use orgchart_render::model::{Bounds, SceneConnector, SceneGraph, SceneNode, ScenePoint};
    pub use orgchart_render::scene::{SceneOptions, SearchResult, SearchState};
    pub use orgchart_render::svg::{DEFAULT_FONT_FAMILY, SvgRenderOptions, render_scene_svg};
    pub use orgchart_render::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
    pub use orgchart_render::viewport::{TouchPoint, ViewTransform, ViewportTransform};
    pub use orgchart_render::{layout_tree, render_scene};

    #[cfg(feature = "raster")]
    pub mod raster;
    pub mod session;

    pub use session::{ChartSession, LoadOutcome, LoadSlot, LoadTicket};

    use orgchart_core::{ChartConfig, DiffReport, Document, OrgTree};
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Core(#[from] orgchart_core::Error),
        #[error(transparent)]
        Render(#[from] orgchart_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Converts an arbitrary string (e.g. a diagram index id) into a conservative SVG `id`
    /// token.
    ///
    /// Unsupported characters become `-`, runs of `-` collapse, and the result always starts
    /// with an ASCII letter (`org-` is prefixed when needed).
    pub fn sanitize_svg_id(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 4);
        for ch in raw.trim().chars() {
            let ok = ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.');
            let ch = if ok { ch } else { '-' };
            if ch == '-' && out.ends_with('-') {
                continue;
            }
            out.push(ch);
        }
        let out = out.trim_matches('-');
        if out.is_empty() {
            return "org-untitled".to_string();
        }
        if out.starts_with(|c: char| c.is_ascii_alphabetic()) {
            out.to_string()
        } else {
            format!("org-{out}")
        }
    }

    /// Live pan/zoom state to bake into an SVG.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct LiveView {
        pub transform: ViewTransform,
        pub width: f64,
        pub height: f64,
    }

    /// Optional pipeline stages. All default to off.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ChartOptions<'a> {
        /// Base snapshot; when set the document is labeled against it and drawn in diff mode.
        pub compare: Option<&'a Document>,
        pub search: Option<&'a str>,
        pub view: Option<LiveView>,
    }

    /// Everything one pipeline run produces.
    #[derive(Debug, Clone)]
    pub struct RenderedChart {
        pub tree: OrgTree,
        pub scene: SceneGraph,
        pub diff: Option<DiffReport>,
        pub search: Option<SearchResult>,
    }

    /// Bundles configuration, text measurement and SVG options for headless rendering.
    ///
    /// All work is CPU-bound and synchronous; the `async` methods are executor-agnostic
    /// wrappers for UI integrations.
    #[derive(Clone)]
    pub struct ChartRenderer {
        pub config: ChartConfig,
        pub measurer: Arc<dyn TextMeasurer + Send + Sync>,
        pub svg: SvgRenderOptions,
    }

    impl Default for ChartRenderer {
        fn default() -> Self {
            Self::with_config(ChartConfig::default())
        }
    }

    impl ChartRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(config: ChartConfig) -> Self {
            let svg = SvgRenderOptions {
                viewbox_padding: config.export().padding,
                ..Default::default()
            };
            Self {
                config,
                measurer: Arc::new(DeterministicTextMeasurer::default()),
                svg,
            }
        }

        pub fn build_tree_sync(&self, doc: &Document) -> Result<OrgTree> {
            Ok(orgchart_core::build_tree(doc, &self.config)?)
        }

        /// Runs tree building, optional diff, layout and scene generation.
        ///
        /// Returns `Ok(None)` when the document has no root record.
        pub fn layout_sync(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
        ) -> Result<Option<RenderedChart>> {
            let started = Instant::now();
            let mut tree = self.build_tree_sync(doc)?;
            if tree.root().is_none() {
                tracing::warn!(records = doc.len(), "no root record found; nothing to render");
                return Ok(None);
            }

            let diff = options.compare.map(|base| orgchart_core::diff(base, doc));
            if let Some(report) = &diff {
                tree.apply_diff(report);
                let s = report.summary();
                tracing::debug!(
                    new = s.new,
                    promoted = s.promoted,
                    demoted = s.demoted,
                    moved = s.moved,
                    unchanged = s.unchanged,
                    "applied snapshot diff"
                );
            }

            let layout = self.config.layout();
            layout_tree(&mut tree, &layout)?;
            let scene_options = SceneOptions {
                diff_mode: diff.is_some(),
                vocabulary: self.config.diff_vocabulary()?,
            };
            let scene = render_scene(&tree, &layout, &scene_options, self.measurer.as_ref())?;
            let search = options
                .search
                .filter(|q| !q.trim().is_empty())
                .map(|q| scene.search(q));

            tracing::debug!(
                nodes = scene.nodes.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "chart pipeline finished"
            );
            Ok(Some(RenderedChart {
                tree,
                scene,
                diff,
                search,
            }))
        }

        pub async fn layout(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
        ) -> Result<Option<RenderedChart>> {
            self.layout_sync(doc, options)
        }

        /// Serializes an already computed chart, optionally under a live transform.
        pub fn chart_svg(&self, chart: &RenderedChart, view: Option<LiveView>) -> String {
            let mut svg = self.svg.clone();
            if let Some(view) = view {
                svg.transform = Some(view.transform);
                svg.viewport_size = Some((view.width, view.height));
            }
            render_scene_svg(&chart.scene, &svg, chart.search.as_ref())
        }

        pub fn render_svg_sync(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
        ) -> Result<Option<String>> {
            let Some(chart) = self.layout_sync(doc, options)? else {
                return Ok(None);
            };
            Ok(Some(self.chart_svg(&chart, options.view)))
        }

        pub async fn render_svg(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
        ) -> Result<Option<String>> {
            self.render_svg_sync(doc, options)
        }

        pub fn render_svg_sync_with_diagram_id(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
            diagram_id: &str,
        ) -> Result<Option<String>> {
            let mut renderer = self.clone();
            renderer.svg.diagram_id = Some(sanitize_svg_id(diagram_id));
            renderer.render_svg_sync(doc, options)
        }

        /// Lays out `doc` and exports its natural-coordinate scene (no live transform).
        #[cfg(feature = "raster")]
        pub fn export_sync(
            &self,
            doc: &Document,
            options: ChartOptions<'_>,
            export: &raster::ExportOptions,
            fonts: &dyn raster::FontLoader,
        ) -> raster::Result<Option<raster::ExportedImage>> {
            let Some(chart) = self.layout_sync(doc, options)? else {
                return Ok(None);
            };
            Ok(Some(raster::export_scene(&chart.scene, export, fonts)?))
        }
    }

}
