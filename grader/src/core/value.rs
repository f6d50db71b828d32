//! In-memory structural values handed to and returned from candidate callables.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// A decoded test-case value.
///
/// Equality is structural and order-sensitive for every variant. Absent trees
/// and lists are `None`: two absent values compare equal, an absent and a
/// present value never do.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    Array(Vec<Value>),
    Matrix(Vec<Vec<Value>>),
    BinaryTree(Option<Box<TreeNode>>),
    LinkedList(Option<Box<ListNode>>),
    Graph(Graph),
}

impl Value {
    /// Shape name used in mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Boolean(_) => "Boolean",
            Value::Array(_) => "Array",
            Value::Matrix(_) => "Matrix",
            Value::BinaryTree(_) => "TreeNode",
            Value::LinkedList(_) => "ListNode",
            Value::Graph(_) => "Graph",
        }
    }
}

/// Binary tree node; each node exclusively owns its children.
///
/// Comparison, cloning, formatting and dropping use explicit stacks and
/// queues, so a skewed tree does not recurse once per level.
pub struct TreeNode {
    pub value: i64,
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
}

impl TreeNode {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }

    pub fn with_children(
        value: i64,
        left: Option<Box<TreeNode>>,
        right: Option<Box<TreeNode>>,
    ) -> Self {
        Self { value, left, right }
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.value != b.value {
                return false;
            }
            for (x, y) in [(&a.left, &b.left), (&a.right, &b.right)] {
                match (x.as_deref(), y.as_deref()) {
                    (None, None) => {}
                    (Some(x), Some(y)) => pending.push((x, y)),
                    _ => return false,
                }
            }
        }
        true
    }
}

impl Eq for TreeNode {}

impl Clone for TreeNode {
    fn clone(&self) -> Self {
        // Index nodes in level order; a child's index is always greater than
        // its parent's, so rebuilding from the back attaches finished subtrees.
        let mut nodes: Vec<&TreeNode> = vec![self];
        let mut links: Vec<(Option<usize>, Option<usize>)> = Vec::new();
        let mut cursor = 0;
        while cursor < nodes.len() {
            let node = nodes[cursor];
            let mut link = (None, None);
            if let Some(left) = node.left.as_deref() {
                nodes.push(left);
                link.0 = Some(nodes.len() - 1);
            }
            if let Some(right) = node.right.as_deref() {
                nodes.push(right);
                link.1 = Some(nodes.len() - 1);
            }
            links.push(link);
            cursor += 1;
        }

        let mut built: Vec<Option<Box<TreeNode>>> = (0..nodes.len()).map(|_| None).collect();
        for index in (1..nodes.len()).rev() {
            let (left, right) = links[index];
            let node = TreeNode {
                value: nodes[index].value,
                left: left.and_then(|child| built[child].take()),
                right: right.and_then(|child| built[child].take()),
            };
            built[index] = Some(Box::new(node));
        }
        let (left, right) = links[0];
        TreeNode {
            value: self.value,
            left: left.and_then(|child| built[child].take()),
            right: right.and_then(|child| built[child].take()),
        }
    }
}

impl fmt::Debug for TreeNode {
    /// Level order with `null` for absent children, trailing nulls trimmed:
    /// `TreeNode[1, null, 2]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots = Vec::new();
        let mut queue = VecDeque::from([Some(self)]);
        while let Some(slot) = queue.pop_front() {
            slots.push(slot.map(|node| node.value));
            if let Some(node) = slot {
                queue.push_back(node.left.as_deref());
                queue.push_back(node.right.as_deref());
            }
        }
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }

        f.write_str("TreeNode[")?;
        for (position, slot) in slots.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            match slot {
                Some(value) => write!(f, "{value}")?,
                None => f.write_str("null")?,
            }
        }
        f.write_str("]")
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending: Vec<Box<TreeNode>> = Vec::new();
        pending.extend(self.left.take());
        pending.extend(self.right.take());
        while let Some(mut node) = pending.pop() {
            pending.extend(node.left.take());
            pending.extend(node.right.take());
        }
    }
}

/// Singly linked list node.
///
/// Comparison, cloning, formatting and dropping walk the chain iteratively so
/// long lists do not recurse once per node.
pub struct ListNode {
    pub value: i64,
    pub next: Option<Box<ListNode>>,
}

impl ListNode {
    pub fn new(value: i64) -> Self {
        Self { value, next: None }
    }

    /// Build a chain in iteration order. An empty iterator yields `None`.
    pub fn from_values<I>(values: I) -> Option<Box<ListNode>>
    where
        I: IntoIterator<Item = i64>,
    {
        let values: Vec<i64> = values.into_iter().collect();
        let mut head = None;
        for value in values.into_iter().rev() {
            head = Some(Box::new(ListNode { value, next: head }));
        }
        head
    }

    /// Payloads from this node to the tail.
    pub fn values(&self) -> ListValues<'_> {
        ListValues {
            current: Some(self),
        }
    }
}

pub struct ListValues<'a> {
    current: Option<&'a ListNode>,
}

impl Iterator for ListValues<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(node.value)
    }
}

impl PartialEq for ListNode {
    fn eq(&self, other: &Self) -> bool {
        let mut left = Some(self);
        let mut right = Some(other);
        loop {
            match (left, right) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.value == b.value => {
                    left = a.next.as_deref();
                    right = b.next.as_deref();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for ListNode {}

impl Clone for ListNode {
    fn clone(&self) -> Self {
        let next = ListNode::from_values(self.values().skip(1));
        ListNode {
            value: self.value,
            next,
        }
    }
}

impl fmt::Debug for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListNode")?;
        f.debug_list().entries(self.values()).finish()
    }
}

impl Drop for ListNode {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

/// Directed graph keyed by source vertex.
///
/// Edge order per source is preserved and significant for equality; vertices
/// that only appear as targets have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    adjacency: BTreeMap<i64, Vec<i64>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `to` to the neighbor list of `from`. Multi-edges and self-loops
    /// are kept.
    pub fn add_edge(&mut self, from: i64, to: i64) {
        self.adjacency.entry(from).or_default().push(to);
    }

    pub fn neighbors(&self, vertex: i64) -> Option<&[i64]> {
        self.adjacency.get(&vertex).map(Vec::as_slice)
    }

    pub fn adjacency(&self) -> &BTreeMap<i64, Vec<i64>> {
        &self.adjacency
    }

    /// Edges in ascending source order, then insertion order per source.
    pub fn edges(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }
}

impl FromIterator<(i64, i64)> for Graph {
    fn from_iter<I: IntoIterator<Item = (i64, i64)>>(iter: I) -> Self {
        let mut graph = Graph::new();
        for (from, to) in iter {
            graph.add_edge(from, to);
        }
        graph
    }
}
