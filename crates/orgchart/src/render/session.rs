//! Interactive chart state: loaded documents, search query, and the live view.
//!
//! Document fetches happen outside this crate. A caller asks for a [`LoadTicket`] before
//! starting a fetch and hands the ticket back with the result; only the most recently issued
//! ticket for a slot is allowed to change the session, so a slow response can never overwrite a
//! newer one.

use super::{ChartOptions, ChartRenderer, LiveView, RenderedChart, ViewportTransform};
use orgchart_core::Document;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSlot {
    /// The document being displayed.
    Primary,
    /// The base snapshot the primary document is diffed against.
    Comparison,
}

impl LoadSlot {
    fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Comparison => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    slot: LoadSlot,
    generation: u64,
}

impl LoadTicket {
    pub fn slot(&self) -> LoadSlot {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started for the same slot; the result was dropped.
    Stale,
    /// The load (or the rebuild it triggered) failed; the previous chart is kept.
    Failed,
}

pub struct ChartSession {
    renderer: ChartRenderer,
    primary: Option<Document>,
    comparison: Option<Document>,
    generations: [u64; 2],
    search: String,
    view: ViewportTransform,
    viewport_size: (f64, f64),
    chart: Option<RenderedChart>,
}

impl ChartSession {
    pub fn new(renderer: ChartRenderer, viewport_width: f64, viewport_height: f64) -> Self {
        let view = ViewportTransform::new(renderer.config.viewport());
        Self {
            renderer,
            primary: None,
            comparison: None,
            generations: [0; 2],
            search: String::new(),
            view,
            viewport_size: (viewport_width, viewport_height),
            chart: None,
        }
    }

    pub fn renderer(&self) -> &ChartRenderer {
        &self.renderer
    }

    pub fn document(&self) -> Option<&Document> {
        self.primary.as_ref()
    }

    pub fn comparison(&self) -> Option<&Document> {
        self.comparison.as_ref()
    }

    pub fn chart(&self) -> Option<&RenderedChart> {
        self.chart.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.view
    }

    /// Gesture handlers (wheel, drag, touch) go through here.
    pub fn viewport_mut(&mut self) -> &mut ViewportTransform {
        &mut self.view
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        self.viewport_size
    }

    pub fn begin_load(&mut self, slot: LoadSlot) -> LoadTicket {
        let generation = &mut self.generations[slot.index()];
        *generation += 1;
        LoadTicket {
            slot,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generations[ticket.slot.index()] == ticket.generation
    }

    pub fn complete_load<E: Display>(
        &mut self,
        ticket: LoadTicket,
        result: Result<Document, E>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(
                slot = ?ticket.slot,
                generation = ticket.generation,
                latest = self.generations[ticket.slot.index()],
                "dropping stale load result"
            );
            return LoadOutcome::Stale;
        }

        let doc = match result {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(slot = ?ticket.slot, error = %err, "document load failed");
                return LoadOutcome::Failed;
            }
        };
        let built = match ticket.slot {
            LoadSlot::Primary => self.rebuild_with(Some(&doc), self.comparison.as_ref()),
            LoadSlot::Comparison => self.rebuild_with(self.primary.as_ref(), Some(&doc)),
        };
        let chart = match built {
            Ok(chart) => chart,
            Err(err) => {
                tracing::warn!(slot = ?ticket.slot, error = %err, "failed to rebuild chart");
                return LoadOutcome::Failed;
            }
        };
        match ticket.slot {
            LoadSlot::Primary => self.primary = Some(doc),
            LoadSlot::Comparison => self.comparison = Some(doc),
        }
        self.chart = chart;
        self.fit();
        LoadOutcome::Applied
    }

    /// Leaves diff mode. Any comparison load still in flight becomes stale.
    ///
    /// The comparison is kept if the chart cannot be rebuilt without it.
    pub fn clear_comparison(&mut self) -> bool {
        self.generations[LoadSlot::Comparison.index()] += 1;
        if self.comparison.is_none() {
            return true;
        }
        match self.rebuild_with(self.primary.as_ref(), None) {
            Ok(chart) => {
                self.comparison = None;
                self.chart = chart;
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to rebuild chart without comparison");
                false
            }
        }
    }

    /// Updates the search partition without re-running layout.
    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
        if let Some(chart) = &mut self.chart {
            chart.search = (!query.trim().is_empty()).then(|| chart.scene.search(query));
        }
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = (width, height);
    }

    pub fn fit(&mut self) {
        let Some(bounds) = self.chart.as_ref().and_then(|c| c.scene.bounds) else {
            return;
        };
        let (w, h) = self.viewport_size;
        self.view.fit(&bounds, w, h);
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// SVG of the current chart under the live transform.
    pub fn render_svg(&self) -> Option<String> {
        let chart = self.chart.as_ref()?;
        let (width, height) = self.viewport_size;
        let view = LiveView {
            transform: self.view.transform(),
            width,
            height,
        };
        Some(self.renderer.chart_svg(chart, Some(view)))
    }

    /// Exports the current chart in natural coordinates. Session state is never modified.
    #[cfg(feature = "raster")]
    pub fn export(
        &self,
        options: &super::raster::ExportOptions,
        fonts: &dyn super::raster::FontLoader,
    ) -> super::raster::Result<Option<super::raster::ExportedImage>> {
        let Some(chart) = &self.chart else {
            return Ok(None);
        };
        Ok(Some(super::raster::export_scene(&chart.scene, options, fonts)?))
    }

    /// Builds a chart from candidate documents without touching session state.
    fn rebuild_with(
        &self,
        primary: Option<&Document>,
        comparison: Option<&Document>,
    ) -> super::Result<Option<RenderedChart>> {
        let Some(doc) = primary else {
            return Ok(None);
        };
        let options = ChartOptions {
            compare: comparison,
            search: Some(self.search.as_str()),
            view: None,
        };
        self.renderer.layout_sync(doc, options)
    }
}
