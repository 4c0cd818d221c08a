use crate::model::{Bounds, SceneConnector, SceneGraph, SceneNode, ScenePoint};
use crate::text::{TextMeasurer, TextStyle};
use crate::{Error, Result};
use orgchart_core::{DiffVocabulary, LayoutConfig, LineType, OrgTree};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Font size used for the name label.
pub const NAME_FONT_SIZE: f64 = 14.0;
/// Font size used for the position label drawn under the name.
pub const POSITION_FONT_SIZE: f64 = 11.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneOptions {
    /// Emit diff classes and highlight connectors touching labeled nodes.
    pub diff_mode: bool,
    pub vocabulary: DiffVocabulary,
}

/// Walks a laid-out tree in pre-order and emits node and connector primitives.
pub fn render_scene(
    tree: &OrgTree,
    layout: &LayoutConfig,
    options: &SceneOptions,
    measurer: &dyn TextMeasurer,
) -> Result<SceneGraph> {
    if tree.root().is_none() {
        return Err(Error::EmptyTree);
    }
    let r = layout.node_radius;
    let name_style = TextStyle {
        font_size: NAME_FONT_SIZE,
        ..Default::default()
    };
    let position_style = TextStyle {
        font_size: POSITION_FONT_SIZE,
        ..Default::default()
    };

    let order = tree.preorder();
    let mut scene = SceneGraph {
        nodes: Vec::with_capacity(order.len()),
        connectors: Vec::with_capacity(order.len().saturating_sub(1)),
        bounds: None,
        diff_mode: options.diff_mode,
        by_name: FxHashMap::default(),
    };
    let mut extents: Vec<(f64, f64)> = Vec::with_capacity(order.len() * 2);

    for id in order {
        let node = tree.node(id);
        let label = if options.diff_mode { node.diff_label } else { None };
        scene.by_name.insert(node.name.clone(), scene.nodes.len());
        scene.nodes.push(SceneNode {
            name: node.name.clone(),
            position: node.position.clone(),
            level: node.level,
            x: node.x,
            y: node.y,
            radius: r,
            diff_label: label,
            diff_class: label.map(|l| l.css_class(options.vocabulary).to_string()),
        });

        // Labels may be wider than the circle; keep them inside the scene bounds.
        let mut half_w = measurer.measure(&node.name, &name_style).width / 2.0;
        if let Some(position) = &node.position {
            half_w = half_w.max(measurer.measure(position, &position_style).width / 2.0);
        }
        let half_w = half_w.max(r);
        extents.push((node.x - half_w, node.y - r));
        extents.push((node.x + half_w, node.y + r));

        if node.children.is_empty() {
            continue;
        }
        let start_y = node.y + r;
        let nearest_child_top = node
            .children
            .iter()
            .map(|c| tree.node(*c).y - r)
            .fold(f64::INFINITY, f64::min);
        let mid_y = (start_y + nearest_child_top) / 2.0;

        for &child_id in &node.children {
            let child = tree.node(child_id);
            let highlighted = options.diff_mode
                && (node.diff_label.is_some() || child.diff_label.is_some());
            scene.connectors.push(SceneConnector {
                from: node.name.clone(),
                to: child.name.clone(),
                points: vec![
                    ScenePoint {
                        x: node.x,
                        y: start_y,
                    },
                    ScenePoint { x: node.x, y: mid_y },
                    ScenePoint {
                        x: child.x,
                        y: mid_y,
                    },
                    ScenePoint {
                        x: child.x,
                        y: child.y - r,
                    },
                ],
                dashed: child.line_type == Some(LineType::Dashed),
                highlighted,
            });
        }
    }

    scene.bounds = Bounds::from_points(extents);
    Ok(scene)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchState {
    Highlighted,
    Faded,
    Neutral,
}

impl SearchState {
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Self::Highlighted => Some("search-highlight"),
            Self::Faded => Some("search-faded"),
            Self::Neutral => None,
        }
    }
}

/// Partition of the scene's nodes for one search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub highlighted: Vec<String>,
    pub faded: Vec<String>,
    pub neutral: Vec<String>,
    /// Indices into [`SceneGraph::connectors`] with a highlighted endpoint.
    pub highlighted_connectors: Vec<usize>,
}

impl SearchResult {
    pub fn state_of(&self, name: &str) -> SearchState {
        if self.highlighted.iter().any(|n| n == name) {
            SearchState::Highlighted
        } else if self.faded.iter().any(|n| n == name) {
            SearchState::Faded
        } else {
            SearchState::Neutral
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

impl SceneGraph {
    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn connectors_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SceneConnector> {
        self.connectors
            .iter()
            .filter(move |c| c.from == name || c.to == name)
    }

    /// Nodes whose position contains `text` (case-insensitive).
    pub fn nodes_with_position(&self, text: &str) -> Vec<&SceneNode> {
        let needle = text.to_lowercase();
        self.nodes
            .iter()
            .filter(|n| {
                n.position
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Case-insensitive substring match on name and position. An empty query leaves every
    /// node neutral; otherwise matches are highlighted and everything else is faded.
    pub fn search(&self, query: &str) -> SearchResult {
        let needle = query.trim().to_lowercase();
        let mut result = SearchResult {
            query: query.to_string(),
            ..Default::default()
        };
        if needle.is_empty() {
            result.neutral = self.nodes.iter().map(|n| n.name.clone()).collect();
            return result;
        }

        for n in &self.nodes {
            let hit = n.name.to_lowercase().contains(&needle)
                || n
                    .position
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&needle));
            if hit {
                result.highlighted.push(n.name.clone());
            } else {
                result.faded.push(n.name.clone());
            }
        }
        result.highlighted_connectors = self
            .connectors
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                result.highlighted.contains(&c.from) || result.highlighted.contains(&c.to)
            })
            .map(|(i, _)| i)
            .collect();
        result
    }

    /// Rebuilds the name index, e.g. after `nodes` was edited in place.
    pub fn reindex(&mut self) {
        self.by_name = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), i))
            .collect();
    }
}
