#![forbid(unsafe_code)]

//! Self-contained image export of a chart scene.
//!
//! Fonts listed in [`ExportOptions::fonts`] are fetched through a [`FontLoader`], embedded as
//! `data:` URLs in `@font-face` rules, and registered with the rasterizer's font database. A
//! font that fails to load is skipped with a warning; the export still succeeds with the
//! remaining styling.

use crate::render::{HeadlessError, SceneGraph, SvgRenderOptions, render_scene_svg};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDateTime;
use orgchart_core::ChartConfig;
use std::str::FromStr;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Headless(#[from] HeadlessError),
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color for JPG rendering")]
    JpegBackground,
    #[error("JPG rendering requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPG")]
    JpegEncode,
    #[error("failed to convert SVG to PDF")]
    PdfConvert,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, thiserror::Error)]
pub enum FontLoadError {
    #[error("unsupported font location {url} (scheme `{scheme}`)")]
    UnsupportedScheme { scheme: String, url: String },
    #[error("failed to read font {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("font {url} is empty")]
    Empty { url: String },
}

/// Fetches font bytes for export. Implement this to plug in an HTTP client.
pub trait FontLoader {
    fn load(&self, url: &Url) -> std::result::Result<Vec<u8>, FontLoadError>;
}

/// Reads `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFontLoader;

impl FontLoader for FsFontLoader {
    fn load(&self, url: &Url) -> std::result::Result<Vec<u8>, FontLoadError> {
        let path = match url.scheme() {
            "file" => url.to_file_path().ok(),
            _ => None,
        };
        let Some(path) = path else {
            return Err(FontLoadError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            });
        };
        let bytes = std::fs::read(&path).map_err(|source| FontLoadError::Io {
            url: url.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(FontLoadError::Empty {
                url: url.to_string(),
            });
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub source: Url,
}

#[derive(Debug, Clone, Default)]
pub struct InlinedFonts {
    /// `@font-face` rules with embedded data.
    pub css: String,
    /// Raw bytes of every font that loaded.
    pub data: Vec<Vec<u8>>,
}

pub fn inline_font_faces(faces: &[FontFace], loader: &dyn FontLoader) -> InlinedFonts {
    let mut out = InlinedFonts::default();
    for face in faces {
        let bytes = match loader.load(&face.source) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(
                    family = %face.family,
                    url = %face.source,
                    error = %err,
                    "skipping font for export"
                );
                continue;
            }
        };
        let (mime, format) = font_kind(&face.source);
        out.css.push_str(&format!(
            "@font-face {{ font-family: \"{}\"; src: url(data:{mime};base64,{}) format(\"{format}\"); }}\n",
            face.family.replace(['"', '\\'], ""),
            BASE64.encode(&bytes)
        ));
        out.data.push(bytes);
    }
    out
}

fn font_kind(url: &Url) -> (&'static str, &'static str) {
    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".woff2") {
        ("font/woff2", "woff2")
    } else if path.ends_with(".woff") {
        ("font/woff", "woff")
    } else if path.ends_with(".otf") {
        ("font/otf", "opentype")
    } else {
        ("font/ttf", "truetype")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Some("white".to_string()),
            jpeg_quality: 90,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub raster: RasterOptions,
    /// Space around the scene bounds, in scene units.
    pub padding: f64,
    pub file_prefix: String,
    pub font_family: String,
    pub fonts: Vec<FontFace>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&ChartConfig::default())
    }
}

impl ExportOptions {
    pub fn from_config(config: &ChartConfig) -> Self {
        let export = config.export();
        Self {
            format: ExportFormat::default(),
            raster: RasterOptions {
                scale: export.scale as f32,
                background: export.background,
                ..Default::default()
            },
            padding: export.padding,
            file_prefix: export.file_prefix,
            font_family: crate::render::DEFAULT_FONT_FAMILY.to_string(),
            fonts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// `<prefix>-YYYYMMDD-HHMMSS.<ext>`
pub fn export_file_name(prefix: &str, format: ExportFormat, at: NaiveDateTime) -> String {
    format!(
        "{prefix}-{}.{}",
        at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Renders `scene` in natural coordinates with inlined fonts and rasterizes it.
pub fn export_scene(
    scene: &SceneGraph,
    options: &ExportOptions,
    loader: &dyn FontLoader,
) -> Result<ExportedImage> {
    let fonts = inline_font_faces(&options.fonts, loader);
    let mut font_family = options.font_family.clone();
    for face in options.fonts.iter().rev() {
        font_family = format!("\"{}\", {font_family}", face.family.replace(['"', '\\'], ""));
    }
    let svg_options = SvgRenderOptions {
        viewbox_padding: options.padding,
        font_family,
        extra_css: (!fonts.css.is_empty()).then(|| fonts.css.clone()),
        ..Default::default()
    };
    let svg = render_scene_svg(scene, &svg_options, None);

    let bytes = match options.format {
        ExportFormat::Png => svg_to_png(&svg, &options.raster, &fonts.data)?,
        ExportFormat::Jpeg => svg_to_jpeg(&svg, &options.raster, &fonts.data)?,
        ExportFormat::Pdf => svg_to_pdf(&svg, &fonts.data)?,
    };
    let file_name = export_file_name(
        &options.file_prefix,
        options.format,
        chrono::Local::now().naive_local(),
    );
    tracing::debug!(file = %file_name, bytes = bytes.len(), "exported chart");
    Ok(ExportedImage {
        file_name,
        format: options.format,
        bytes,
    })
}

pub fn svg_to_png(svg: &str, options: &RasterOptions, fonts: &[Vec<u8>]) -> Result<Vec<u8>> {
    let pixmap = svg_to_pixmap(svg, options.scale, options.background.as_deref(), fonts)?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions, fonts: &[Vec<u8>]) -> Result<Vec<u8>> {
    let bg = options.background.as_deref().unwrap_or("white");
    let Some(color) = parse_tiny_skia_color(bg) else {
        return Err(RasterError::JpegBackground);
    };
    if color.alpha() != 1.0 {
        return Err(RasterError::JpegOpaqueBackgroundRequired);
    }

    let pixmap = svg_to_pixmap(svg, options.scale, Some(bg), fonts)?;
    let (w, h) = (pixmap.width(), pixmap.height());

    // The background fill is opaque, so dropping alpha loses nothing.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    let mut enc =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, options.jpeg_quality);
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| RasterError::JpegEncode)?;
    Ok(out)
}

pub fn svg_to_pdf(svg: &str, fonts: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    for data in fonts {
        opt.fontdb_mut().load_font_data(data.clone());
    }
    opt.font_family = "Arial".to_string();

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|_| RasterError::PdfConvert)
}

fn svg_to_pixmap(
    svg: &str,
    scale: f32,
    background: Option<&str>,
    fonts: &[Vec<u8>],
) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    for data in fonts {
        opt.fontdb_mut().load_font_data(data.clone());
    }
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    // Chart SVGs always carry width/height equal to the viewBox size; usvg maps the viewBox
    // origin to (0,0) itself.
    let size = tree.size();
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let width_px = (size.width() * scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;

    if let Some(color) = background.and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    let channels: Vec<u8> = match digits.len() {
        3 | 4 => digits.iter().map(|&d| (d << 4) | d).collect(),
        6 | 8 => digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect(),
        _ => return None,
    };
    let alpha = channels.get(3).copied().unwrap_or(255);
    Some(tiny_skia::Color::from_rgba8(
        channels[0],
        channels[1],
        channels[2],
        alpha,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect width="10" height="10" fill="black"/></svg>"#;

    struct FixedLoader(Option<Vec<u8>>);

    impl FontLoader for FixedLoader {
        fn load(&self, url: &Url) -> std::result::Result<Vec<u8>, FontLoadError> {
            self.0.clone().ok_or_else(|| FontLoadError::Empty {
                url: url.to_string(),
            })
        }
    }

    #[test]
    fn svg_to_png_produces_png_signature() {
        let bytes = svg_to_png(SQUARE, &RasterOptions::default(), &[]).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn svg_to_pdf_produces_pdf_signature() {
        let bytes = svg_to_pdf(SQUARE, &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn jpeg_requires_opaque_background() {
        let options = RasterOptions {
            background: Some("transparent".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svg_to_jpeg(SQUARE, &options, &[]),
            Err(RasterError::JpegOpaqueBackgroundRequired)
        ));
        let bytes = svg_to_jpeg(SQUARE, &RasterOptions::default(), &[]).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn colors_parse_short_and_long_hex() {
        let c = parse_tiny_skia_color("#fff").unwrap();
        assert_eq!(c.to_color_u8().red(), 255);
        let c = parse_tiny_skia_color("#11223380").unwrap().to_color_u8();
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (0x11, 0x22, 0x33, 0x80));
        assert!(parse_tiny_skia_color("#12").is_none());
        assert!(parse_tiny_skia_color("teal").is_none());
    }

    #[test]
    fn file_name_carries_timestamp() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 2)
            .unwrap();
        assert_eq!(
            export_file_name("org-chart", ExportFormat::Png, at),
            "org-chart-20240305-090702.png"
        );
        assert_eq!(
            export_file_name("team", ExportFormat::Jpeg, at),
            "team-20240305-090702.jpg"
        );
    }

    #[test]
    fn fonts_are_embedded_as_data_urls() {
        let faces = [FontFace {
            family: "Brand".to_string(),
            source: Url::parse("https://cdn.example.com/brand.woff2").unwrap(),
        }];
        let inlined = inline_font_faces(&faces, &FixedLoader(Some(b"abc".to_vec())));
        assert!(inlined.css.contains("font-family: \"Brand\""));
        assert!(inlined.css.contains("url(data:font/woff2;base64,YWJj)"));
        assert_eq!(inlined.data, [b"abc".to_vec()]);

        let failed = inline_font_faces(&faces, &FixedLoader(None));
        assert!(failed.css.is_empty());
        assert!(failed.data.is_empty());
    }

    #[test]
    fn fs_loader_rejects_remote_urls() {
        let url = Url::parse("https://cdn.example.com/brand.ttf").unwrap();
        assert!(matches!(
            FsFontLoader.load(&url),
            Err(FontLoadError::UnsupportedScheme { .. })
        ));
    }
}
