use crate::diff::DiffVocabulary;
use crate::tree::RootPolicy;
use crate::{Error, Result};
use serde_json::{Map, Value, json};
use std::path::Path;

/// Loosely-typed chart configuration.
///
/// Config files are merged over [`ChartConfig::defaults`] and read back through the typed views
/// ([`LayoutConfig`], [`ViewportConfig`], [`ExportConfig`], [`TreeConfig`]). Unknown keys are kept
/// so a host page can carry its own settings in the same document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig(Value);

impl Default for ChartConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ChartConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn defaults() -> Self {
        Self(json!({
            "layout": {
                "nodeRadius": 50.0,
                "levelSpacing": 160.0,
                "horizontalSpacing": 160.0,
                "verticalPadding": 100.0
            },
            "viewport": {
                "minScale": 0.1,
                "maxScale": 5.0,
                "maxFitScale": 1.2,
                "wheelStep": 1.1
            },
            "export": {
                "scale": 2.0,
                "padding": 50.0,
                "background": "white",
                "filePrefix": "org-chart"
            },
            "tree": {
                "rootPolicy": "last"
            },
            "diff": {
                "vocabulary": "demoted"
            }
        }))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses a JSON config document and merges it over the defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        Self::merged_over_defaults(value)
    }

    /// Parses a YAML config document and merges it over the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        Self::merged_over_defaults(value)
    }

    /// Reads a config file, picking the format from the extension (`.yaml`/`.yml`, else JSON).
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    fn merged_over_defaults(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidConfig {
                message: "top-level config must be an object".to_string(),
            });
        }
        let mut cfg = Self::defaults();
        cfg.deep_merge(&value);
        Ok(cfg)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?.as_f64().filter(|v| v.is_finite())
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // Configs can be built from any JSON value via `from_value`; coerce to an object so this
        // never panics on user input.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }

    pub fn layout(&self) -> LayoutConfig {
        let d = LayoutConfig::default();
        LayoutConfig {
            node_radius: self
                .get_f64("layout.nodeRadius")
                .unwrap_or(d.node_radius)
                .max(1.0),
            level_spacing: self
                .get_f64("layout.levelSpacing")
                .unwrap_or(d.level_spacing)
                .max(0.0),
            horizontal_spacing: self
                .get_f64("layout.horizontalSpacing")
                .unwrap_or(d.horizontal_spacing)
                .max(1.0),
            vertical_padding: self
                .get_f64("layout.verticalPadding")
                .unwrap_or(d.vertical_padding),
        }
    }

    pub fn viewport(&self) -> ViewportConfig {
        let d = ViewportConfig::default();
        let min_scale = self
            .get_f64("viewport.minScale")
            .unwrap_or(d.min_scale)
            .max(f64::EPSILON);
        let max_scale = self
            .get_f64("viewport.maxScale")
            .unwrap_or(d.max_scale)
            .max(min_scale);
        let fit_ceiling = max_scale.min(MAX_FIT_SCALE_LIMIT).max(min_scale);
        ViewportConfig {
            min_scale,
            max_scale,
            max_fit_scale: self
                .get_f64("viewport.maxFitScale")
                .unwrap_or(d.max_fit_scale)
                .clamp(min_scale, fit_ceiling),
            wheel_step: self
                .get_f64("viewport.wheelStep")
                .filter(|v| *v > 1.0)
                .unwrap_or(d.wheel_step),
        }
    }

    pub fn export(&self) -> ExportConfig {
        let d = ExportConfig::default();
        ExportConfig {
            scale: self
                .get_f64("export.scale")
                .filter(|v| *v > 0.0)
                .unwrap_or(d.scale),
            padding: self.get_f64("export.padding").unwrap_or(d.padding).max(0.0),
            background: self
                .get_str("export.background")
                .map(str::to_string)
                .or(d.background),
            file_prefix: self
                .get_str("export.filePrefix")
                .map(str::to_string)
                .unwrap_or(d.file_prefix),
        }
    }

    pub fn tree(&self) -> Result<TreeConfig> {
        let root_policy = match self.get_str("tree.rootPolicy") {
            None => RootPolicy::default(),
            Some(raw) => raw.parse::<RootPolicy>().map_err(|_| Error::InvalidConfig {
                message: format!("unknown tree.rootPolicy: {raw}"),
            })?,
        };
        Ok(TreeConfig { root_policy })
    }

    pub fn diff_vocabulary(&self) -> Result<DiffVocabulary> {
        match self.get_str("diff.vocabulary") {
            None => Ok(DiffVocabulary::default()),
            Some(raw) => raw.parse::<DiffVocabulary>().map_err(|_| Error::InvalidConfig {
                message: format!("unknown diff.vocabulary: {raw}"),
            }),
        }
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

/// Spacing constants consumed by the layout engine and renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub node_radius: f64,
    /// Vertical distance between two levels.
    pub level_spacing: f64,
    /// Minimum width reserved for a leaf.
    pub horizontal_spacing: f64,
    /// y offset of level 1.
    pub vertical_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_radius: 50.0,
            level_spacing: 160.0,
            horizontal_spacing: 160.0,
            vertical_padding: 100.0,
        }
    }
}

/// Largest `viewport.maxFitScale` honored; fitting a small chart never magnifies past this.
pub const MAX_FIT_SCALE_LIMIT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Upper bound applied when fitting content; fitting never magnifies past this.
    pub max_fit_scale: f64,
    /// Zoom factor applied per wheel notch.
    pub wheel_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            max_fit_scale: 1.2,
            wheel_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Fixed upscale factor used for raster output.
    pub scale: f64,
    /// Space added around the scene bounding box.
    pub padding: f64,
    pub background: Option<String>,
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            padding: 50.0,
            background: Some("white".to_string()),
            file_prefix: "org-chart".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeConfig {
    pub root_policy: RootPolicy,
}
