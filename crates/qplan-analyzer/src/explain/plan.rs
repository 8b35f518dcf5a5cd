//! Plan Model - The uniform plan tree shared by every plan parser
//!
//! Parsers build a tree bottom-up out of [`DetachedNode`]s: a node is only
//! attached to its parent once its whole subtree is complete. The finished
//! tree is frozen into a [`PlanTree`] arena, which is immutable and hands out
//! [`PlanNode`] handles for navigation in both directions.

use crate::config::MAX_NESTING_DEPTH_LIMIT;
use crate::explain::error::{PlanError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute holding the total cost of a query block
pub const QUERY_COST_KEY: &str = "query_cost";
/// Attributes summed into the cost of a table access
pub const ACCESS_COST_KEYS: [&str; 2] = ["read_cost", "eval_cost"];
/// Attributes holding an estimated row count, in lookup order
pub const ROW_COUNT_KEYS: [&str; 2] = ["rows_examined_per_scan", "rows"];
/// Attribute naming the table a node reads
pub const TABLE_NAME_KEY: &str = "table_name";

/// Deepest tree accepted when restoring a saved plan. Parsers add a root and a
/// leaf level around their nested productions.
pub const MAX_RESTORED_DEPTH: usize = MAX_NESTING_DEPTH_LIMIT + 2;

/// What a node carries, depending on the parser that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeContent {
    /// Node produced from plan text, described by a single label
    Text { label: String },
    /// Node produced from a JSON plan, named after its key
    Json {
        name: String,
        #[serde(default)]
        attributes: IndexMap<String, String>,
    },
}

impl NodeContent {
    /// Label shown for the node: the text label or the JSON key name
    pub fn label(&self) -> &str {
        match self {
            Self::Text { label } => label,
            Self::Json { name, .. } => name,
        }
    }

    /// Named attributes; text nodes have none
    pub fn attributes(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Text { .. } => None,
            Self::Json { attributes, .. } => Some(attributes),
        }
    }

    /// Looks up a single attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes()?.get(key).map(String::as_str)
    }
}

/// A node that is not linked into a tree yet, owning its subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedNode {
    pub content: NodeContent,
    pub children: Vec<DetachedNode>,
}

impl DetachedNode {
    /// Creates a labelled text node without children
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            content: NodeContent::Text {
                label: label.into(),
            },
            children: Vec::new(),
        }
    }

    /// Creates a JSON node with attributes and children
    pub fn json(
        name: impl Into<String>,
        attributes: IndexMap<String, String>,
        children: Vec<DetachedNode>,
    ) -> Self {
        Self {
            content: NodeContent::Json {
                name: name.into(),
                attributes,
            },
            children,
        }
    }

    /// Adds a child node
    pub fn with_child(mut self, child: DetachedNode) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a completed child node
    pub fn push_child(&mut self, child: DetachedNode) {
        self.children.push(child);
    }

    /// Label of this node
    pub fn label(&self) -> &str {
        self.content.label()
    }

    /// Total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// Identifier of a node inside its [`PlanTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in depth-first order
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NodeSlot {
    content: NodeContent,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Immutable arena holding one or more plan trees
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTree {
    nodes: Vec<NodeSlot>,
    roots: Vec<NodeId>,
}

impl PlanTree {
    /// Freezes detached root nodes into a tree. Node ids follow depth-first order.
    pub fn from_roots(roots: Vec<DetachedNode>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            roots: Vec::with_capacity(roots.len()),
        };
        // Popped in depth-first order
        let mut pending: Vec<(DetachedNode, Option<NodeId>)> =
            roots.into_iter().rev().map(|root| (root, None)).collect();
        while let Some((node, parent)) = pending.pop() {
            let id = tree.push_node(node.content, parent);
            pending.extend(node.children.into_iter().rev().map(|child| (child, Some(id))));
        }
        tree
    }

    /// Rebuilds a tree from nodes listed in depth-first order, each naming the
    /// position of its parent.
    ///
    /// Fails when a parent is not an ancestor of the previous node (the list is
    /// not in depth-first order) or when the tree is deeper than
    /// [`MAX_RESTORED_DEPTH`].
    pub fn from_flat(
        nodes: impl IntoIterator<Item = (NodeContent, Option<usize>)>,
    ) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        // Ancestors of the next node, from its root down
        let mut path: Vec<NodeId> = Vec::new();

        for (position, (content, parent)) in nodes.into_iter().enumerate() {
            match parent {
                None => path.clear(),
                Some(parent) => {
                    while path.last().is_some_and(|id| id.0 != parent) {
                        path.pop();
                    }
                    if path.is_empty() {
                        return Err(PlanError::InvalidStructure(format!(
                            "node {position} names parent {parent}, which is not one of its preceding ancestors"
                        )));
                    }
                }
            }
            if path.len() >= MAX_RESTORED_DEPTH {
                return Err(PlanError::TooDeeplyNested {
                    limit: MAX_RESTORED_DEPTH,
                });
            }

            let id = tree.push_node(content, path.last().copied());
            path.push(id);
        }

        Ok(tree)
    }

    fn push_node(&mut self, content: NodeContent, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeSlot {
            content,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Root nodes, in the order they were produced
    pub fn roots(&self) -> impl DoubleEndedIterator<Item = PlanNode<'_>> + ExactSizeIterator {
        self.roots.iter().map(move |&id| PlanNode { tree: self, id })
    }

    /// Returns the node with the given id
    pub fn node(&self, id: NodeId) -> Option<PlanNode<'_>> {
        (id.0 < self.nodes.len()).then_some(PlanNode { tree: self, id })
    }

    /// Total number of nodes across all roots
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over every node of every root, depth-first
    pub fn iter(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(self.roots().rev().collect())
    }

    /// Copies the tree back out into detached nodes
    pub fn to_detached(&self) -> Vec<DetachedNode> {
        self.roots().map(PlanNode::detach).collect()
    }

    /// Returns true if both trees have the same shape and node contents
    pub fn structurally_eq(&self, other: &PlanTree) -> bool {
        self.roots().len() == other.roots().len()
            && self
                .roots()
                .zip(other.roots())
                .all(|(a, b)| a.structurally_eq(b))
    }

    fn slot(&self, id: NodeId) -> &NodeSlot {
        &self.nodes[id.0]
    }
}

/// Handle to one node of a [`PlanTree`]
#[derive(Clone, Copy)]
pub struct PlanNode<'a> {
    tree: &'a PlanTree,
    id: NodeId,
}

impl<'a> PlanNode<'a> {
    fn slot(self) -> &'a NodeSlot {
        self.tree.slot(self.id)
    }

    /// Identifier of this node within its tree
    pub fn id(self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to
    pub fn tree(self) -> &'a PlanTree {
        self.tree
    }

    pub fn content(self) -> &'a NodeContent {
        &self.slot().content
    }

    pub fn label(self) -> &'a str {
        self.content().label()
    }

    pub fn attributes(self) -> Option<&'a IndexMap<String, String>> {
        self.content().attributes()
    }

    pub fn attribute(self, key: &str) -> Option<&'a str> {
        self.content().attribute(key)
    }

    /// Table read by this node, if the producer recorded one
    pub fn object_name(self) -> Option<&'a str> {
        self.attribute(TABLE_NAME_KEY)
    }

    /// Child nodes in order; empty for leaves
    pub fn children(self) -> impl DoubleEndedIterator<Item = PlanNode<'a>> + ExactSizeIterator {
        let tree = self.tree;
        self.slot()
            .children
            .iter()
            .map(move |&id| PlanNode { tree, id })
    }

    /// Parent node; `None` for roots
    pub fn parent(self) -> Option<PlanNode<'a>> {
        self.slot().parent.map(|id| PlanNode {
            tree: self.tree,
            id,
        })
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(self) -> impl Iterator<Item = PlanNode<'a>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn is_root(self) -> bool {
        self.slot().parent.is_none()
    }

    pub fn is_leaf(self) -> bool {
        self.slot().children.is_empty()
    }

    /// Iterates over this node and its descendants, depth-first
    pub fn descendants(self) -> PlanNodeIterator<'a> {
        PlanNodeIterator::new(vec![self])
    }

    /// Leaf nodes of this subtree, left to right
    pub fn leaves(self) -> impl Iterator<Item = PlanNode<'a>> {
        self.descendants().filter(|n| n.is_leaf())
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(self) -> usize {
        self.descendants().count()
    }

    /// Returns the maximum depth of this subtree
    pub fn depth(self) -> usize {
        1 + self.children().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// First node of this subtree with the given label
    pub fn find_by_label(self, label: &str) -> Option<PlanNode<'a>> {
        self.descendants().find(|n| n.label() == label)
    }

    /// Estimated cost of this node.
    ///
    /// Uses `query_cost` when present, otherwise the sum of `read_cost` and
    /// `eval_cost`. Nodes without cost attributes report the sum of their
    /// children's costs, or `None` if no descendant has one.
    pub fn cost(self) -> Option<f64> {
        if let Some(cost) = self.numeric_attribute(QUERY_COST_KEY) {
            return Some(cost);
        }

        let access_cost: Vec<f64> = ACCESS_COST_KEYS
            .iter()
            .filter_map(|key| self.numeric_attribute(key))
            .collect();
        if !access_cost.is_empty() {
            return Some(access_cost.iter().sum());
        }

        sum_present(self.children().map(|c| c.cost()))
    }

    /// Estimated number of rows produced by this node.
    ///
    /// Falls back to the sum over children like [`PlanNode::cost`].
    pub fn row_count(self) -> Option<u64> {
        let own = ROW_COUNT_KEYS.iter().find_map(|key| {
            let value = self.attribute(key)?.trim();
            value
                .parse::<u64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().map(|v| v.max(0.0).round() as u64))
        });
        if own.is_some() {
            return own;
        }

        let mut total = None;
        for rows in self.children().filter_map(|c| c.row_count()) {
            total = Some(total.unwrap_or(0u64).saturating_add(rows));
        }
        total
    }

    fn numeric_attribute(self, key: &str) -> Option<f64> {
        self.attribute(key)?.trim().parse::<f64>().ok()
    }

    /// Copies this subtree out into a detached node
    pub fn detach(self) -> DetachedNode {
        // Subtree ids are contiguous in depth-first order. Walking them backwards
        // finishes every child before its parent; finished siblings wait on
        // `done` with the first one on top.
        let end = self.id.0 + self.node_count();
        let mut done: Vec<DetachedNode> = Vec::new();
        for slot in self.tree.nodes[self.id.0 + 1..end].iter().rev() {
            let split = done.len().saturating_sub(slot.children.len());
            let children = done.drain(split..).rev().collect();
            done.push(DetachedNode {
                content: slot.content.clone(),
                children,
            });
        }

        DetachedNode {
            content: self.content().clone(),
            children: done.into_iter().rev().collect(),
        }
    }

    /// Returns true if both subtrees have the same shape and node contents
    pub fn structurally_eq(self, other: PlanNode<'_>) -> bool {
        self.content() == other.content()
            && self.children().len() == other.children().len()
            && self
                .children()
                .zip(other.children())
                .all(|(a, b)| a.structurally_eq(b))
    }
}

impl fmt::Debug for PlanNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanNode")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("children", &self.slot().children.len())
            .finish()
    }
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .fold(None, |total, value| Some(total.unwrap_or(0.0) + value))
}

/// Iterator for traversing plan nodes depth-first
pub struct PlanNodeIterator<'a> {
    stack: Vec<PlanNode<'a>>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(stack: Vec<PlanNode<'a>>) -> Self {
        Self { stack }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = PlanNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order so we visit them in order
        self.stack.extend(node.children().rev());
        Some(node)
    }
}

/// A parsed execution plan together with the queries it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SavedPlan", into = "SavedPlan")]
pub struct Plan {
    query: String,
    plan_query: Option<String>,
    tree: PlanTree,
}

impl Plan {
    /// Creates a plan; fails with [`PlanError::EmptyPlan`] when there are no roots
    pub fn new(
        query: impl Into<String>,
        plan_query: Option<String>,
        roots: Vec<DetachedNode>,
    ) -> Result<Self> {
        Self::from_tree(query.into(), plan_query, PlanTree::from_roots(roots))
    }

    fn from_tree(query: String, plan_query: Option<String>, tree: PlanTree) -> Result<Self> {
        if tree.roots.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        Ok(Self {
            query,
            plan_query,
            tree,
        })
    }

    /// The query whose plan this is
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The statement used to retrieve the plan, e.g. `EXPLAIN FORMAT=JSON ...`
    pub fn plan_query(&self) -> Option<&str> {
        self.plan_query.as_deref()
    }

    pub fn tree(&self) -> &PlanTree {
        &self.tree
    }

    pub fn roots(&self) -> impl DoubleEndedIterator<Item = PlanNode<'_>> + ExactSizeIterator {
        self.tree.roots()
    }

    /// The first root node
    pub fn root(&self) -> PlanNode<'_> {
        PlanNode {
            tree: &self.tree,
            id: self.tree.roots[0],
        }
    }

    /// Returns an iterator over all nodes in the plan (depth-first)
    pub fn iter_nodes(&self) -> PlanNodeIterator<'_> {
        self.tree.iter()
    }

    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Sum of the root costs, `None` if no root has a cost
    pub fn total_cost(&self) -> Option<f64> {
        sum_present(self.roots().map(|r| r.cost()))
    }

    /// Sum of the root row estimates, `None` if no root has one
    pub fn total_rows(&self) -> Option<u64> {
        self.roots()
            .filter_map(|r| r.row_count())
            .fold(None, |total, rows| Some(total.unwrap_or(0u64).saturating_add(rows)))
    }

    /// Returns true if both plans have structurally equal trees
    pub fn structurally_eq(&self, other: &Plan) -> bool {
        self.tree.structurally_eq(&other.tree)
    }
}

/// Serialized form of a [`Plan`]: the arena as a flat node list, so the
/// document nesting stays the same however deep the plan is
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedPlan {
    query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan_query: Option<String>,
    nodes: Vec<SavedNode>,
}

/// One node of a [`SavedPlan`], in depth-first order
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedNode {
    #[serde(flatten)]
    content: NodeContent,
    /// Position of the parent in the node list; absent for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<usize>,
}

impl From<Plan> for SavedPlan {
    fn from(plan: Plan) -> Self {
        let nodes = plan
            .tree
            .nodes
            .into_iter()
            .map(|slot| SavedNode {
                content: slot.content,
                parent: slot.parent.map(NodeId::index),
            })
            .collect();
        Self {
            query: plan.query,
            plan_query: plan.plan_query,
            nodes,
        }
    }
}

impl TryFrom<SavedPlan> for Plan {
    type Error = PlanError;

    fn try_from(saved: SavedPlan) -> Result<Self> {
        let tree = PlanTree::from_flat(
            saved
                .nodes
                .into_iter()
                .map(|node| (node.content, node.parent)),
        )?;
        Plan::from_tree(saved.query, saved.plan_query, tree)
    }
}
