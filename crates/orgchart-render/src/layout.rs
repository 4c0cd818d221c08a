//! Tidy-ish top-down tree layout.
//!
//! Two passes over the rooted tree:
//! 1. widths, children before parents: a leaf reserves `horizontal_spacing`, an internal node
//!    reserves `max(horizontal_spacing, sum of child widths)`;
//! 2. positions: children are packed left to right inside their parent's reserved span, leaves
//!    sit in the middle of their span and a parent sits halfway between its first and last
//!    child.
//!
//! Rows come from each node's declared level, not from its depth, so a chart can skip rows
//! (e.g. a level-4 report directly under a level-2 manager). Nodes without a level take the
//! row under their parent.
//!
//! Both passes are iterative, so very deep charts do not grow the call stack.

use crate::model::Bounds;
use crate::{Error, Result};
use orgchart_core::{LayoutConfig, OrgTree};

/// Assigns `subtree_width`, `x` and `y` to every node reachable from the root and returns the
/// bounds of the node circles.
pub fn layout_tree(tree: &mut OrgTree, config: &LayoutConfig) -> Result<Bounds> {
    let Some(root) = tree.root() else {
        return Err(Error::EmptyTree);
    };

    let post = tree.postorder();
    for &id in &post {
        let children_width: f64 = tree
            .node(id)
            .children
            .iter()
            .map(|c| tree.node(*c).subtree_width)
            .sum();
        tree.node_mut(id).subtree_width = children_width.max(config.horizontal_spacing);
    }

    // (node, span start, row of the parent)
    let mut stack = vec![(root, 0.0_f64, 0_i64)];
    while let Some((id, start_x, parent_row)) = stack.pop() {
        // Levels come straight from the document and may be any i64.
        let row = tree.node(id).level.unwrap_or(parent_row.saturating_add(1));
        let node = tree.node_mut(id);
        node.y = config.vertical_padding + (row as f64 - 1.0) * config.level_spacing;
        if node.children.is_empty() {
            node.x = start_x + node.subtree_width / 2.0;
            continue;
        }

        let mut cursor = start_x;
        let mut spans = Vec::with_capacity(tree.node(id).children.len());
        for &child in &tree.node(id).children {
            spans.push((child, cursor, row));
            cursor += tree.node(child).subtree_width;
        }
        // Pushed in reverse so children are popped left to right.
        stack.extend(spans.into_iter().rev());
    }

    for &id in &post {
        let node = tree.node(id);
        let (Some(first), Some(last)) = (node.children.first(), node.children.last()) else {
            continue;
        };
        let x = (tree.node(*first).x + tree.node(*last).x) / 2.0;
        tree.node_mut(id).x = x;
    }

    let r = config.node_radius;
    let bounds = Bounds::from_points(post.iter().flat_map(|&id| {
        let n = tree.node(id);
        [(n.x - r, n.y - r), (n.x + r, n.y + r)]
    }))
    .ok_or(Error::EmptyTree)?;

    tracing::debug!(
        nodes = post.len(),
        width = bounds.width(),
        height = bounds.height(),
        "laid out org tree"
    );
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgchart_core::{Document, Record};

    fn cfg() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn laid_out(records: Vec<Record>) -> OrgTree {
        let mut tree = OrgTree::build(&Document::from_records(records));
        layout_tree(&mut tree, &cfg()).unwrap();
        tree
    }

    #[test]
    fn single_child_is_centered_under_parent() {
        let tree = laid_out(vec![Record::new("CEO", 1), Record::new("VP", 2).under("CEO")]);
        let ceo = tree.get("CEO").unwrap();
        let vp = tree.get("VP").unwrap();
        assert_eq!(vp.y, cfg().vertical_padding + cfg().level_spacing);
        assert_eq!(ceo.y, cfg().vertical_padding);
        assert_eq!(ceo.x, vp.x);
        assert_eq!(vp.x, cfg().horizontal_spacing / 2.0);
    }

    #[test]
    fn parent_sits_between_first_and_last_child() {
        let tree = laid_out(vec![
            Record::new("CEO", 1),
            Record::new("A", 2).under("CEO"),
            Record::new("A1", 3).under("A"),
            Record::new("A2", 3).under("A"),
            Record::new("A3", 3).under("A"),
            Record::new("B", 2).under("CEO"),
        ]);
        let a = tree.get("A").unwrap();
        let b = tree.get("B").unwrap();
        assert_eq!(a.subtree_width, 480.0);
        assert_eq!(b.subtree_width, 160.0);
        assert_eq!(tree.get("CEO").unwrap().subtree_width, 640.0);
        assert_eq!(a.x, 240.0);
        assert_eq!(b.x, 560.0);
        // Midpoint of first and last child, not a weighted centroid.
        assert_eq!(tree.get("CEO").unwrap().x, 400.0);
    }

    #[test]
    fn rows_follow_declared_level_not_depth() {
        let tree = laid_out(vec![
            Record::new("CEO", 1),
            Record::new("Advisor", 3).under("CEO"),
        ]);
        let c = cfg();
        assert_eq!(
            tree.get("Advisor").unwrap().y,
            c.vertical_padding + 2.0 * c.level_spacing
        );
    }

    #[test]
    fn missing_level_takes_row_below_parent() {
        let mut doc = Document::from_records([Record::new("CEO", 1), Record::new("Lead", 3).under("CEO")]);
        doc.insert(orgchart_core::Record {
            level: None,
            ..Record::new("Intern", 0).under("Lead")
        });
        let mut tree = OrgTree::build(&doc);
        layout_tree(&mut tree, &cfg()).unwrap();
        let c = cfg();
        assert_eq!(
            tree.get("Intern").unwrap().y,
            c.vertical_padding + 3.0 * c.level_spacing
        );
    }

    #[test]
    fn extreme_levels_are_laid_out_without_overflow() {
        let mut doc = Document::from_records([
            Record::new("CEO", 1),
            Record::new("Low", i64::MIN).under("CEO"),
            Record::new("High", i64::MAX).under("CEO"),
        ]);
        doc.insert(orgchart_core::Record {
            level: None,
            ..Record::new("Below High", 0).under("High")
        });
        let mut tree = OrgTree::build(&doc);
        let bounds = layout_tree(&mut tree, &cfg()).unwrap();
        assert!(bounds.width().is_finite());
        assert!(bounds.height().is_finite());
        assert!(tree.get("Low").unwrap().y < 0.0);
        let high = tree.get("High").unwrap().y;
        assert!(high.is_finite());
        assert_eq!(tree.get("Below High").unwrap().y, high);
    }

    #[test]
    fn rootless_tree_is_an_error() {
        let mut tree = OrgTree::build(&Document::from_records([Record::new("A", 2)]));
        assert!(matches!(layout_tree(&mut tree, &cfg()), Err(Error::EmptyTree)));
    }

    #[test]
    fn bounds_cover_node_circles() {
        let mut tree = OrgTree::build(&Document::from_records([Record::new("CEO", 1)]));
        let b = layout_tree(&mut tree, &cfg()).unwrap();
        assert_eq!(b.min_x, 80.0 - 50.0);
        assert_eq!(b.max_x, 80.0 + 50.0);
        assert_eq!(b.min_y, 50.0);
        assert_eq!(b.max_y, 150.0);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut records = vec![Record::new("n0", 1)];
        for i in 1..20_000 {
            records.push(Record::new(format!("n{i}"), i + 1).under(format!("n{}", i - 1)));
        }
        let tree = laid_out(records);
        assert_eq!(tree.reachable_count(), 20_000);
        assert_eq!(tree.get("n19999").unwrap().x, tree.get("n0").unwrap().x);
    }
}
