//! Flat records → rooted tree.
//!
//! Nodes live in an arena owned by [`OrgTree`]; parent → child edges are stored as [`NodeId`]
//! lists. A record attaches to the parent named by `under` when that name exists in the same
//! document. Records whose `under` does not resolve and whose level is `1` are root candidates;
//! every other unresolved record is an orphan and stays out of the rooted tree.

use crate::diff::{DiffLabel, DiffReport};
use crate::record::{Document, LineType};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How to pick the root when more than one level-1 record has no resolvable parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootPolicy {
    /// The last candidate in document order wins.
    #[default]
    Last,
    /// The first candidate in document order wins.
    First,
    /// More than one candidate is an error.
    Strict,
}

impl FromStr for RootPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first" => Ok(Self::First),
            "strict" => Ok(Self::Strict),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub level: Option<i64>,
    pub under: Option<String>,
    pub position: Option<String>,
    pub line_type: Option<LineType>,
    pub diff_label: Option<DiffLabel>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub x: f64,
    pub y: f64,
    pub subtree_width: f64,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrgTree {
    nodes: Vec<Node>,
    by_name: FxHashMap<String, NodeId>,
    root: Option<NodeId>,
    root_candidates: Vec<NodeId>,
}

impl OrgTree {
    /// Builds a tree with the default [`RootPolicy::Last`].
    pub fn build(doc: &Document) -> Self {
        let mut tree = Self::link(doc);
        tree.root = tree.root_candidates.last().copied();
        tree.report();
        tree
    }

    pub fn build_with_policy(doc: &Document, policy: RootPolicy) -> Result<Self> {
        let mut tree = Self::link(doc);
        tree.root = match policy {
            RootPolicy::Last => tree.root_candidates.last().copied(),
            RootPolicy::First => tree.root_candidates.first().copied(),
            RootPolicy::Strict => {
                if tree.root_candidates.len() > 1 {
                    return Err(Error::MultipleRoots {
                        candidates: tree.root_candidate_names().map(str::to_string).collect(),
                    });
                }
                tree.root_candidates.first().copied()
            }
        };
        tree.report();
        Ok(tree)
    }

    fn link(doc: &Document) -> Self {
        let mut nodes: Vec<Node> = Vec::with_capacity(doc.len());
        let mut by_name: FxHashMap<String, NodeId> =
            FxHashMap::with_capacity_and_hasher(doc.len(), Default::default());
        for record in doc.records() {
            let id = NodeId(nodes.len());
            by_name.insert(record.name.clone(), id);
            nodes.push(Node {
                name: record.name.clone(),
                level: record.level,
                under: record.under.clone(),
                position: record.position.clone(),
                line_type: record.line_type,
                diff_label: None,
                parent: None,
                children: Vec::new(),
                x: 0.0,
                y: 0.0,
                subtree_width: 0.0,
            });
        }

        let mut root_candidates = Vec::new();
        for idx in 0..nodes.len() {
            let id = NodeId(idx);
            let parent = nodes[idx]
                .under
                .as_deref()
                .and_then(|under| by_name.get(under).copied());
            match parent {
                Some(parent) => {
                    nodes[parent.0].children.push(id);
                    nodes[idx].parent = Some(parent);
                }
                None if nodes[idx].level == Some(1) => root_candidates.push(id),
                None => {}
            }
        }

        Self {
            nodes,
            by_name,
            root: None,
            root_candidates,
        }
    }

    fn report(&self) {
        match self.root {
            None => tracing::warn!(records = self.nodes.len(), "no root node found (level 1)"),
            Some(root) => {
                if self.root_candidates.len() > 1 {
                    tracing::warn!(
                        root = %self.nodes[root.0].name,
                        candidates = self.root_candidates.len(),
                        "multiple level-1 records without a parent"
                    );
                }
                let orphans = self.nodes.len() - self.reachable_count();
                if orphans > 0 {
                    tracing::debug!(orphans, "records not reachable from the root");
                }
            }
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.map(|id| &self.nodes[id.0])
    }

    pub fn root_candidate_names(&self) -> impl Iterator<Item = &str> {
        self.root_candidates
            .iter()
            .map(|id| self.nodes[id.0].name.as_str())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.id_of(name).map(|id| &self.nodes[id.0])
    }

    /// All nodes, including orphans, in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids reachable from the root, in pre-order (parent before children, children in
    /// document order). Empty when there is no root.
    pub fn preorder(&self) -> Vec<NodeId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Node ids reachable from the root, children before their parent.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut out = self.preorder();
        // Reversed pre-order visits every child before its parent.
        out.reverse();
        out
    }

    pub fn reachable_count(&self) -> usize {
        self.preorder().len()
    }

    /// Names of records that are not part of the rooted tree.
    pub fn orphans(&self) -> Vec<&str> {
        let mut reachable = vec![false; self.nodes.len()];
        for id in self.preorder() {
            reachable[id.0] = true;
        }
        self.nodes
            .iter()
            .zip(reachable)
            .filter(|(_, r)| !r)
            .map(|(n, _)| n.name.as_str())
            .collect()
    }

    /// Number of edges between `id` and the top of its chain.
    pub fn depth_of(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes[id.0].parent;
        while let Some(p) = cur {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            cur = self.nodes[p.0].parent;
        }
        depth
    }

    /// Attaches diff labels to the nodes named in `report`. Existing labels are replaced.
    pub fn apply_diff(&mut self, report: &DiffReport) {
        for node in &mut self.nodes {
            node.diff_label = report.label_of(&node.name);
        }
    }

    pub fn clear_diff(&mut self) {
        for node in &mut self.nodes {
            node.diff_label = None;
        }
    }

    pub fn snapshot(&self) -> TreeSnapshot<'_> {
        let nodes = self
            .preorder()
            .into_iter()
            .map(|id| {
                let n = &self.nodes[id.0];
                SnapshotNode {
                    name: &n.name,
                    level: n.level,
                    position: n.position.as_deref(),
                    parent: n.parent.map(|p| self.nodes[p.0].name.as_str()),
                    children: n
                        .children
                        .iter()
                        .map(|c| self.nodes[c.0].name.as_str())
                        .collect(),
                    diff_label: n.diff_label,
                }
            })
            .collect();
        TreeSnapshot {
            root: self.root_node().map(|n| n.name.as_str()),
            nodes,
            orphans: self.orphans(),
        }
    }
}

/// Serializable, flat view of the rooted tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot<'a> {
    pub root: Option<&'a str>,
    pub nodes: Vec<SnapshotNode<'a>>,
    pub orphans: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode<'a> {
    pub name: &'a str,
    pub level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<&'a str>,
    pub parent: Option<&'a str>,
    pub children: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_label: Option<DiffLabel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn names(tree: &OrgTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| tree.node(*id).name.clone()).collect()
    }

    #[test]
    fn children_follow_document_order() {
        let doc = Document::from_records([
            Record::new("CEO", 1),
            Record::new("Zoe", 2).under("CEO"),
            Record::new("Adam", 2).under("CEO"),
        ]);
        let tree = OrgTree::build(&doc);
        let root = tree.root_node().unwrap();
        assert_eq!(names(&tree, &root.children), ["Zoe", "Adam"]);
    }

    #[test]
    fn child_listed_before_parent_still_attaches() {
        let doc = Document::from_records([
            Record::new("Dev", 3).under("Lead"),
            Record::new("Lead", 2).under("CEO"),
            Record::new("CEO", 1),
        ]);
        let tree = OrgTree::build(&doc);
        assert_eq!(tree.reachable_count(), 3);
        assert_eq!(tree.depth_of(tree.id_of("Dev").unwrap()), 2);
    }

    #[test]
    fn dangling_parent_is_orphaned_unless_level_one() {
        let doc = Document::from_records([
            Record::new("CEO", 1),
            Record::new("Ghost", 2).under("Nobody"),
            Record::new("Ghost report", 3).under("Ghost"),
        ]);
        let tree = OrgTree::build(&doc);
        assert_eq!(tree.root_node().unwrap().name, "CEO");
        assert_eq!(tree.orphans(), ["Ghost", "Ghost report"]);
        assert_eq!(tree.reachable_count(), 1);
    }

    #[test]
    fn level_one_with_invalid_parent_is_a_root_candidate() {
        let doc = Document::from_records([Record::new("Chair", 1).under("Board")]);
        let tree = OrgTree::build(&doc);
        assert_eq!(tree.root_node().unwrap().name, "Chair");
    }

    #[test]
    fn no_level_one_record_means_no_root() {
        let doc = Document::from_records([Record::new("A", 2), Record::new("B", 3).under("A")]);
        let tree = OrgTree::build(&doc);
        assert!(tree.root().is_none());
        assert!(tree.preorder().is_empty());
        assert_eq!(tree.orphans(), ["A", "B"]);
    }

    #[test]
    fn root_policies_pick_expected_candidate() {
        let doc = Document::from_records([Record::new("First", 1), Record::new("Second", 1)]);
        let last = OrgTree::build_with_policy(&doc, RootPolicy::Last).unwrap();
        assert_eq!(last.root_node().unwrap().name, "Second");
        let first = OrgTree::build_with_policy(&doc, RootPolicy::First).unwrap();
        assert_eq!(first.root_node().unwrap().name, "First");
        let err = OrgTree::build_with_policy(&doc, RootPolicy::Strict).unwrap_err();
        match err {
            Error::MultipleRoots { candidates } => assert_eq!(candidates, ["First", "Second"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_parented_record_is_never_reachable() {
        let doc = Document::from_records([Record::new("CEO", 1), Record::new("Loop", 2).under("Loop")]);
        let tree = OrgTree::build(&doc);
        assert_eq!(tree.reachable_count(), 1);
        assert_eq!(tree.orphans(), ["Loop"]);
    }

    #[test]
    fn postorder_visits_children_first() {
        let doc = Document::from_records([
            Record::new("CEO", 1),
            Record::new("A", 2).under("CEO"),
            Record::new("A1", 3).under("A"),
            Record::new("B", 2).under("CEO"),
        ]);
        let tree = OrgTree::build(&doc);
        let post = names(&tree, &tree.postorder());
        let pos = |n: &str| post.iter().position(|x| x == n).unwrap();
        assert!(pos("A1") < pos("A"));
        assert!(pos("A") < pos("CEO"));
        assert!(pos("B") < pos("CEO"));
        assert_eq!(names(&tree, &tree.preorder()), ["CEO", "A", "A1", "B"]);
    }

    #[test]
    fn snapshot_lists_reachable_nodes_and_orphans() {
        let doc = Document::from_records([
            Record::new("CEO", 1),
            Record::new("VP", 2).under("CEO").position("Sales"),
            Record::new("Lost", 2).under("Missing"),
        ]);
        let tree = OrgTree::build(&doc);
        let value = serde_json::to_value(tree.snapshot()).unwrap();
        assert_eq!(value["root"], "CEO");
        assert_eq!(value["nodes"][1]["parent"], "CEO");
        assert_eq!(value["nodes"][1]["position"], "Sales");
        assert_eq!(value["orphans"][0], "Lost");
    }
}
