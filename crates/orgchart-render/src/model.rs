use orgchart_core::DiffLabel;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn padded(&self, pad: f64) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub name: String,
    pub position: Option<String>,
    pub level: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub diff_label: Option<DiffLabel>,
    /// Visual class derived from the diff label; only set in diff mode.
    pub diff_class: Option<String>,
}

/// Elbow path from the bottom of a parent circle to the top of a child circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConnector {
    pub from: String,
    pub to: String,
    pub points: Vec<ScenePoint>,
    pub dashed: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SceneGraphData")]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub connectors: Vec<SceneConnector>,
    /// Extent of circles and labels in natural (untransformed) coordinates.
    pub bounds: Option<Bounds>,
    pub diff_mode: bool,
    #[serde(skip)]
    pub(crate) by_name: FxHashMap<String, usize>,
}

/// Wire form of [`SceneGraph`]; the name index is rebuilt on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneGraphData {
    nodes: Vec<SceneNode>,
    connectors: Vec<SceneConnector>,
    bounds: Option<Bounds>,
    diff_mode: bool,
}

impl From<SceneGraphData> for SceneGraph {
    fn from(data: SceneGraphData) -> Self {
        let mut scene = Self {
            nodes: data.nodes,
            connectors: data.connectors,
            bounds: data.bounds,
            diff_mode: data.diff_mode,
            by_name: FxHashMap::default(),
        };
        scene.reindex();
        scene
    }
}

impl SceneGraph {
    pub fn to_json_string(&self, pretty: bool) -> crate::Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}
