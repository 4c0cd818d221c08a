use futures::executor::block_on;
use orgchart::index::{DiagramIndex, base_url_for_path};
use orgchart::portal::{ProjectCatalog, ProjectFilter, StatusTone};
use orgchart::render::raster::{ExportFormat, ExportOptions, FontFace, FsFontLoader, RasterError};
use orgchart::render::{ChartOptions, ChartRenderer, HeadlessError};
use orgchart::{ChartConfig, DiffVocabulary, Document};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    BadArgument(String),
    Io(std::io::Error),
    Chart(orgchart::Error),
    Headless(HeadlessError),
    Raster(RasterError),
    Json(serde_json::Error),
    NoRoot,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::BadArgument(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Chart(err) => write!(f, "{err}"),
            CliError::Headless(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NoRoot => write!(
                f,
                "No root record found (need a level-1 record without a valid `under`)"
            ),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<orgchart::Error> for CliError {
    fn from(value: orgchart::Error) -> Self {
        Self::Chart(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Headless(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Tree,
    Layout,
    Render,
    Diff,
    Search,
    Index,
    Projects,
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(Self::Tree),
            "layout" => Ok(Self::Layout),
            "render" => Ok(Self::Render),
            "diff" => Ok(Self::Diff),
            "search" => Ok(Self::Search),
            "index" => Ok(Self::Index),
            "projects" => Ok(Self::Projects),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum RenderFormat {
    #[default]
    Svg,
    Raster(ExportFormat),
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("svg") {
            return Ok(Self::Svg);
        }
        s.parse::<ExportFormat>().map(Self::Raster)
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Option<Command>,
    positionals: Vec<String>,
    config: Option<String>,
    pretty: bool,
    realigned: bool,
    render_format: RenderFormat,
    render_scale: Option<f32>,
    background: Option<String>,
    compare: Option<String>,
    search: Option<String>,
    fonts: Vec<String>,
    diagram_id: Option<String>,
    out: Option<String>,
    department: Option<String>,
    technology: Option<String>,
}

fn usage() -> &'static str {
    "orgchart-cli\n\
\n\
USAGE:\n\
  orgchart-cli [--config <file>] tree [--pretty] [<doc>|-]\n\
  orgchart-cli [--config <file>] layout [--pretty] [<doc>|-]\n\
  orgchart-cli [--config <file>] render [--format svg|png|jpg|pdf] [--scale <n>] [--background <css-color>] [--compare <base-doc>] [--search <query>] [--font <family>=<path-or-url>]... [--id <diagram-id>] [--out <path>] [<doc>|-]\n\
  orgchart-cli [--config <file>] diff [--pretty] [--realigned] <base-doc> <target-doc>\n\
  orgchart-cli [--config <file>] search <query> [<doc>|-]\n\
  orgchart-cli index [--pretty] <index.json>\n\
  orgchart-cli projects [--department <name>] [--tech <name>] [--search <text>] [--pretty] <projects.json>\n\
\n\
NOTES:\n\
  - Documents are JSON (or YAML for .yaml/.yml files); '-' or no path reads JSON from stdin.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - PNG/JPG/PDF output defaults to <prefix>-YYYYMMDD-HHMMSS.<ext> in the current directory.\n\
  - Set ORGCHART_LOG (e.g. ORGCHART_LOG=debug) to control log output on stderr.\n\
\n\
EXIT CODES:\n\
  0 ok, 1 error, 2 usage, 3 no root record found\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        let mut value = || it.next().cloned().ok_or(CliError::Usage(usage()));
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--realigned" => args.realigned = true,
            "--config" => args.config = Some(value()?),
            "--format" => {
                args.render_format = value()?
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                let scale = value()?
                    .parse::<f32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.render_scale = Some(scale);
            }
            "--background" => {
                let bg = value()?;
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--compare" => args.compare = Some(value()?),
            "--search" => args.search = Some(value()?),
            "--font" => args.fonts.push(value()?),
            "--id" => args.diagram_id = Some(value()?),
            "--out" => args.out = Some(value()?),
            "--department" => args.department = Some(value()?),
            "--tech" => args.technology = Some(value()?),
            "-" => args.positionals.push(a.clone()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            other => match (args.command, other.parse::<Command>()) {
                (None, Ok(cmd)) if args.positionals.is_empty() => args.command = Some(cmd),
                _ => args.positionals.push(other.to_string()),
            },
        }
    }

    let command = args.command.unwrap_or_default();
    let (min, max) = match command {
        Command::Tree | Command::Layout | Command::Render => (0, 1),
        Command::Diff => (2, 2),
        Command::Search => (1, 2),
        Command::Index | Command::Projects => (1, 1),
    };
    if args.positionals.len() < min || args.positionals.len() > max {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ORGCHART_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn is_yaml(path: Option<&str>) -> bool {
    path.and_then(|p| Path::new(p).extension())
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn read_document(input: Option<&str>) -> Result<Document, CliError> {
    let text = read_input(input)?;
    let doc = if is_yaml(input) {
        Document::from_yaml_str(&text)?
    } else {
        Document::from_json_str(&text)?
    };
    tracing::debug!(records = doc.len(), input = input.unwrap_or("-"), "loaded document");
    Ok(doc)
}

fn load_config(path: Option<&str>) -> Result<ChartConfig, CliError> {
    match path {
        None => Ok(ChartConfig::default()),
        Some(path) => Ok(ChartConfig::from_path(Path::new(path))?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_bytes(bytes: &[u8], out: &str) -> Result<(), CliError> {
    if out == "-" {
        std::io::stdout().lock().write_all(bytes)?;
    } else {
        std::fs::write(out, bytes)?;
    }
    Ok(())
}

/// `<family>=<path-or-url>`; bare paths are resolved against the working directory.
fn parse_font(arg: &str) -> Result<FontFace, CliError> {
    let bad = || {
        CliError::BadArgument(format!(
            "invalid --font {arg:?}; expected <family>=<path-or-url>"
        ))
    };
    let (family, location) = arg.split_once('=').ok_or_else(bad)?;
    let (family, location) = (family.trim(), location.trim());
    if family.is_empty() || location.is_empty() {
        return Err(bad());
    }
    let source = match Url::parse(location) {
        // Single-letter "schemes" are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => url,
        _ => {
            let path = Path::new(location);
            let abs = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()?.join(path)
            };
            Url::from_file_path(&abs).map_err(|_| bad())?
        }
    };
    Ok(FontFace {
        family: family.to_string(),
        source,
    })
}

fn tone_name(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Active => "active",
        StatusTone::Maintenance => "maintenance",
        StatusTone::InDevelopment => "in-development",
        StatusTone::Other => "other",
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let renderer = ChartRenderer::with_config(config.clone());
    let first = args.positionals.first().map(String::as_str);

    match args.command.unwrap_or_default() {
        Command::Tree => {
            let doc = read_document(first)?;
            let tree = renderer.build_tree_sync(&doc)?;
            write_json(&tree.snapshot(), args.pretty)?;
            if tree.root().is_none() {
                return Err(CliError::NoRoot);
            }
            Ok(())
        }
        Command::Layout => {
            let doc = read_document(first)?;
            let Some(chart) = renderer.layout_sync(&doc, ChartOptions::default())? else {
                return Err(CliError::NoRoot);
            };
            write_json(&chart.scene, args.pretty)
        }
        Command::Render => {
            let doc = read_document(first)?;
            let base = args.compare.as_deref().map(|p| read_document(Some(p))).transpose()?;
            let options = ChartOptions {
                compare: base.as_ref(),
                search: args.search.as_deref(),
                view: None,
            };

            match args.render_format {
                RenderFormat::Svg => {
                    let svg = match &args.diagram_id {
                        Some(id) => renderer.render_svg_sync_with_diagram_id(&doc, options, id)?,
                        None => block_on(renderer.render_svg(&doc, options))?,
                    };
                    let Some(svg) = svg else {
                        return Err(CliError::NoRoot);
                    };
                    match args.out.as_deref() {
                        None => print!("{svg}"),
                        Some(path) => write_bytes(svg.as_bytes(), path)?,
                    }
                }
                RenderFormat::Raster(format) => {
                    let mut export = ExportOptions::from_config(&config);
                    export.format = format;
                    if let Some(scale) = args.render_scale {
                        export.raster.scale = scale;
                    }
                    if args.background.is_some() {
                        export.raster.background = args.background.clone();
                    }
                    export.fonts = args
                        .fonts
                        .iter()
                        .map(|f| parse_font(f))
                        .collect::<Result<_, _>>()?;

                    let Some(image) =
                        renderer.export_sync(&doc, options, &export, &FsFontLoader)?
                    else {
                        return Err(CliError::NoRoot);
                    };
                    let out = args.out.clone().unwrap_or(image.file_name);
                    write_bytes(&image.bytes, &out)?;
                    if out != "-" {
                        eprintln!("wrote {out}");
                    }
                }
            }
            Ok(())
        }
        Command::Diff => {
            let base = read_document(first)?;
            let target = read_document(args.positionals.get(1).map(String::as_str))?;
            let vocabulary = if args.realigned {
                DiffVocabulary::Realigned
            } else {
                config.diff_vocabulary()?
            };
            let report = orgchart::diff(&base, &target);
            let out = json!({
                "labels": report.labels_value(vocabulary),
                "summary": report.summary(),
                "removed": report.removed_names(&base),
            });
            write_json(&out, args.pretty)
        }
        Command::Search => {
            let query = first.unwrap_or_default();
            let doc = read_document(args.positionals.get(1).map(String::as_str))?;
            let Some(chart) = renderer.layout_sync(&doc, ChartOptions::default())? else {
                return Err(CliError::NoRoot);
            };
            write_json(&chart.scene.search(query), args.pretty)
        }
        Command::Index => {
            let path = first.unwrap_or_default();
            let index = DiagramIndex::from_json_str(&read_input(Some(path))?)?;
            let resolved = index.resolve(&base_url_for_path(Path::new(path))?)?;
            write_json(&resolved, args.pretty)
        }
        Command::Projects => {
            let catalog = ProjectCatalog::from_json_str(&read_input(first)?)?;
            let filter = ProjectFilter {
                department: args.department.clone(),
                technology: args.technology.clone(),
                search: args.search.clone().unwrap_or_default(),
            };
            let projects: Vec<Value> = catalog
                .filter(&filter)
                .into_iter()
                .map(|p| {
                    let tags = p.tag_summary();
                    let tone = p.status_tone();
                    json!({
                        "name": p.name,
                        "department": p.department(),
                        "status": p.status_label(),
                        "tone": tone_name(tone),
                        "palette": tone.palette(),
                        "icon": p.category.icon_class(),
                        "tags": tags.shown,
                        "more": tags.overflow_label(),
                        "metadata": p
                            .metadata_rows()
                            .into_iter()
                            .map(|(k, v)| (k, Value::String(v)))
                            .collect::<serde_json::Map<_, _>>(),
                        "resources": p.resources.iter().map(|r| json!({
                            "name": r.name,
                            "value": r.value,
                            "action": r.action(),
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            let out = json!({
                "departments": catalog.departments(),
                "technologies": catalog.tech_facets(),
                "projects": projects,
            });
            write_json(&out, args.pretty)
        }
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::NoRoot) => {
            eprintln!("{}", CliError::NoRoot);
            std::process::exit(3);
        }
        Err(err @ CliError::BadArgument(_)) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
