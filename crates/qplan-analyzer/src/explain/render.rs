//! Plain-text rendering of plan trees
//!
//! Only uses the node interface, so it works the same for every dialect.

use crate::explain::plan::{Plan, PlanNode};
use std::fmt::Write;

const INDENT: &str = "  ";

/// Renders every root of `plan` as an indented tree, one node per line.
///
/// Nodes that read a table show it in brackets, and nodes with cost or row
/// estimates show them in parentheses.
pub fn render_tree(plan: &Plan) -> String {
    let mut out = String::new();
    for root in plan.roots() {
        render_node(&mut out, root, 0);
    }
    out
}

fn render_node(out: &mut String, node: PlanNode<'_>, level: usize) {
    // Writing to a String cannot fail
    let _ = write!(out, "{}{}", INDENT.repeat(level), node.label());

    if let Some(table) = node.object_name() {
        let _ = write!(out, " [{table}]");
    }

    let mut estimates = Vec::new();
    if let Some(cost) = node.cost() {
        estimates.push(format!("cost={cost:.2}"));
    }
    if let Some(rows) = node.row_count() {
        estimates.push(format!("rows={rows}"));
    }
    if !estimates.is_empty() {
        let _ = write!(out, " ({})", estimates.join(", "));
    }
    out.push('\n');

    for child in node.children() {
        render_node(out, child, level + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::plan::DetachedNode;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_text_plan() {
        let root = DetachedNode::text("PLAN JOIN (A NATURAL, B INDEX (IX))").with_child(
            DetachedNode::text("JOIN")
                .with_child(DetachedNode::text("A NATURAL"))
                .with_child(DetachedNode::text("B INDEX(IX)")),
        );
        let plan = Plan::new("q", None, vec![root]).unwrap();

        assert_eq!(
            render_tree(&plan),
            "PLAN JOIN (A NATURAL, B INDEX (IX))\n  JOIN\n    A NATURAL\n    B INDEX(IX)\n"
        );
    }

    #[test]
    fn test_render_json_plan_with_estimates() {
        let mut leaf = IndexMap::new();
        leaf.insert("table_name".to_string(), "users".to_string());
        leaf.insert("read_cost".to_string(), "1.5".to_string());
        leaf.insert("rows_examined_per_scan".to_string(), "10".to_string());
        let root = DetachedNode::json(
            "query_block",
            IndexMap::new(),
            vec![DetachedNode::json("nested_loop#1", leaf, Vec::new())],
        );
        let plan = Plan::new("q", None, vec![root]).unwrap();

        assert_eq!(
            render_tree(&plan),
            "query_block (cost=1.50, rows=10)\n  nested_loop#1 [users] (cost=1.50, rows=10)\n"
        );
    }

    #[test]
    fn test_render_multiple_roots() {
        let plan = Plan::new(
            "q",
            None,
            vec![DetachedNode::text("first"), DetachedNode::text("second")],
        )
        .unwrap();
        assert_eq!(render_tree(&plan), "first\nsecond\n");
    }
}
