use crate::model::{Bounds, SceneGraph};
use crate::scene::SearchResult;
use crate::viewport::ViewTransform;
use std::fmt::Write as _;

pub const DEFAULT_FONT_FAMILY: &str = "\"Segoe UI\", Roboto, Helvetica, Arial, sans-serif";

const BASE_CSS: &str = r#"
.node-circle { fill: #ffffff; stroke: #2563eb; stroke-width: 2; }
.node-text { fill: #111827; font-size: 14px; font-weight: 600; text-anchor: middle; dominant-baseline: central; }
.node-position { fill: #4b5563; font-size: 11px; text-anchor: middle; dominant-baseline: central; }
.connector-line { fill: none; stroke: #9ca3af; stroke-width: 2; }
.connector-dashed { stroke-dasharray: 6 4; }
.connector-highlight { stroke: #f59e0b; stroke-width: 3; }
.diff-new .node-circle { fill: #dcfce7; stroke: #16a34a; }
.diff-promoted .node-circle { fill: #dbeafe; stroke: #1d4ed8; }
.diff-demoted .node-circle, .diff-realigned .node-circle { fill: #ffedd5; stroke: #ea580c; }
.diff-moved .node-circle { fill: #f3e8ff; stroke: #7e22ce; }
.search-highlight .node-circle { stroke: #dc2626; stroke-width: 4; }
.search-faded { opacity: 0.25; }
"#;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Adds extra space around the computed viewBox.
    pub viewbox_padding: f64,
    /// Optional root `id` attribute.
    pub diagram_id: Option<String>,
    /// Live pan/zoom transform. `None` renders natural coordinates (used for export).
    pub transform: Option<ViewTransform>,
    /// Viewport size in screen pixels; used as the viewBox when a transform is applied.
    pub viewport_size: Option<(f64, f64)>,
    pub font_family: String,
    /// Extra rules appended to the embedded stylesheet (e.g. inlined `@font-face` blocks).
    pub extra_css: Option<String>,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            viewbox_padding: 50.0,
            diagram_id: None,
            transform: None,
            viewport_size: None,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            extra_css: None,
        }
    }
}

/// Serializes a scene graph into a standalone SVG document.
pub fn render_scene_svg(
    scene: &SceneGraph,
    options: &SvgRenderOptions,
    search: Option<&SearchResult>,
) -> String {
    let bounds = scene.bounds.unwrap_or(Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 100.0,
        max_y: 100.0,
    });
    let (vb_x, vb_y, vb_w, vb_h) = match (options.transform, options.viewport_size) {
        (Some(_), Some((w, h))) => (0.0, 0.0, w.max(1.0), h.max(1.0)),
        _ => {
            let b = bounds.padded(options.viewbox_padding.max(0.0));
            (b.min_x, b.min_y, b.width().max(1.0), b.height().max(1.0))
        }
    };
    let search = search.filter(|s| s.is_active());

    let mut out = String::new();
    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg""#);
    if let Some(id) = &options.diagram_id {
        let _ = write!(&mut out, r#" id="{}""#, escape_xml(id));
    }
    let _ = writeln!(
        &mut out,
        r#" class="org-chart" width="{}" height="{}" viewBox="{} {} {} {}">"#,
        fmt(vb_w),
        fmt(vb_h),
        fmt(vb_x),
        fmt(vb_y),
        fmt(vb_w),
        fmt(vb_h)
    );

    out.push_str("<style>");
    let _ = write!(
        &mut out,
        "\n.org-chart {{ font-family: {}; }}",
        escape_xml(&options.font_family)
    );
    out.push_str(BASE_CSS);
    if let Some(extra) = &options.extra_css {
        out.push_str(&escape_xml(extra));
        out.push('\n');
    }
    out.push_str("</style>\n");

    match options.transform {
        Some(t) => {
            let _ = write!(
                &mut out,
                r#"<g class="viewport" transform="{}">"#,
                t.to_svg_transform()
            );
        }
        None => out.push_str(r#"<g class="viewport">"#),
    }

    out.push_str(r#"<g class="connectors">"#);
    for (idx, c) in scene.connectors.iter().enumerate() {
        out.push_str(r#"<path class="connector-line"#);
        if c.dashed {
            out.push_str(" connector-dashed");
        }
        if c.highlighted {
            out.push_str(" connector-highlight");
        }
        if let Some(s) = search {
            if !s.highlighted_connectors.contains(&idx) {
                out.push_str(" search-faded");
            }
        }
        out.push_str(r#"" d=""#);
        for (i, p) in c.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(&mut out, "{cmd} {} {}", fmt(p.x), fmt(p.y));
        }
        let _ = write!(
            &mut out,
            r#"" data-from="{}" data-to="{}"/>"#,
            escape_xml(&c.from),
            escape_xml(&c.to)
        );
    }
    out.push_str("</g>\n");

    out.push_str(r#"<g class="nodes">"#);
    for n in &scene.nodes {
        out.push_str(r#"<g class="node-group"#);
        if let Some(class) = &n.diff_class {
            out.push(' ');
            out.push_str(class);
        }
        if let Some(class) = search.and_then(|s| s.state_of(&n.name).css_class()) {
            out.push(' ');
            out.push_str(class);
        }
        let _ = write!(&mut out, r#"" data-name="{}""#, escape_xml(&n.name));
        if let Some(p) = &n.position {
            let _ = write!(&mut out, r#" data-position="{}""#, escape_xml(p));
        }
        out.push('>');
        let _ = write!(
            &mut out,
            r#"<circle class="node-circle" cx="{}" cy="{}" r="{}"/>"#,
            fmt(n.x),
            fmt(n.y),
            fmt(n.radius)
        );
        let name_y = if n.position.is_some() { n.y - 7.0 } else { n.y };
        let _ = write!(
            &mut out,
            r#"<text class="node-text" x="{}" y="{}">{}</text>"#,
            fmt(n.x),
            fmt(name_y),
            escape_xml(&n.name)
        );
        if let Some(p) = &n.position {
            let _ = write!(
                &mut out,
                r#"<text class="node-position" x="{}" y="{}">{}</text>"#,
                fmt(n.x),
                fmt(n.y + 11.0),
                escape_xml(p)
            );
        }
        out.push_str("</g>");
    }
    out.push_str("</g>\n</g>\n</svg>\n");
    out
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_xml_into(&mut out, text);
    out
}

pub(crate) fn escape_xml_into(out: &mut String, text: &str) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let esc = match b {
            b'&' => Some("&amp;"),
            b'<' => Some("&lt;"),
            b'>' => Some("&gt;"),
            b'"' => Some("&quot;"),
            b'\'' => Some("&#39;"),
            _ => None,
        };
        let Some(esc) = esc else {
            continue;
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}

/// Round-trippable decimal without `-0` or tiny float noise.
pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}
