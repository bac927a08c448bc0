//! Expression-tree reshaping
//!
//! A fragment with an expression mode matches operands and operators as a
//! flat sibling list; this pass rebuilds that list into a precedence-shaped
//! tree. Operators are child fragments carrying an `expression_order`; they
//! are reduced in ascending order (lower binds tighter) and left to right
//! within one order, which yields left associativity.
//!
//! Each reduction absorbs the operator's syntactic previous and next
//! siblings. `BinaryTree` nests every reduction; `LikeNameTree` instead
//! appends into the left operand when it is the same operator fragment, so
//! chains like `1+2+3` flatten into one n-ary node.

use crate::arena::{MatchArena, Node, NodeId};
use crate::fragment::ExpressionMode;
use crate::language::LanguageMatcher;

/// Reshape an expression fragment's immediate children
///
/// Returns the new child list. Operators missing an operand on either side
/// are left in place unchanged.
pub fn reshape(
    arena: &mut MatchArena,
    lang: &LanguageMatcher,
    mode: ExpressionMode,
    children: &[NodeId],
) -> Vec<NodeId> {
    if mode == ExpressionMode::None || children.len() < 2 {
        return children.to_vec();
    }

    // Operators sorted by (order, position): tightest first, left to right.
    let mut operators: Vec<(usize, usize)> = children
        .iter()
        .enumerate()
        .filter_map(|(pos, &id)| Some((operator_order(arena, lang, id)?, pos)))
        .collect();
    if operators.is_empty() {
        return children.to_vec();
    }
    operators.sort_unstable();

    // Doubly linked list over the original positions; reductions unlink
    // absorbed siblings without shifting the rest.
    let mut list = LinkedChildren::new(children);
    for (_, pos) in operators {
        let (left, right) = match (list.prev[pos], list.next[pos]) {
            (Some(l), Some(r)) => (l, r),
            _ => continue,
        };
        let op_id = list.node[pos];
        let left_id = list.node[left];
        let right_id = list.node[right];

        let absorb_into_left = mode == ExpressionMode::LikeNameTree
            && same_fragment(arena, left_id, op_id);
        if absorb_into_left {
            let mut new_children = arena.children(left_id).to_vec();
            new_children.extend_from_slice(arena.children(op_id));
            new_children.push(right_id);
            let start = arena.node(left_id).start();
            let end = node_end(arena, right_id).max(node_end(arena, left_id));
            arena.reshape_fragment(left_id, start, end - start, &new_children);
            list.unlink(pos);
            list.unlink(right);
        } else {
            let mut new_children = Vec::with_capacity(arena.children(op_id).len() + 2);
            new_children.push(left_id);
            new_children.extend_from_slice(arena.children(op_id));
            new_children.push(right_id);
            let start = arena.node(left_id).start();
            let end = node_end(arena, right_id).max(node_end(arena, op_id));
            arena.reshape_fragment(op_id, start, end - start, &new_children);
            list.unlink(left);
            list.unlink(right);
        }
    }
    list.collect()
}

fn operator_order(arena: &MatchArena, lang: &LanguageMatcher, id: NodeId) -> Option<usize> {
    match arena.node(id) {
        Node::Fragment { fragment, .. } => lang.fragment(fragment as usize).expression_order,
        Node::Token { .. } => None,
    }
}

fn same_fragment(arena: &MatchArena, a: NodeId, b: NodeId) -> bool {
    matches!(
        (arena.node(a), arena.node(b)),
        (Node::Fragment { fragment: fa, .. }, Node::Fragment { fragment: fb, .. }) if fa == fb
    )
}

#[inline]
fn node_end(arena: &MatchArena, id: NodeId) -> u32 {
    let node = arena.node(id);
    node.start() + node.length()
}

struct LinkedChildren {
    node: Vec<NodeId>,
    prev: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
    head: Option<usize>,
}

impl LinkedChildren {
    fn new(children: &[NodeId]) -> Self {
        let len = children.len();
        Self {
            node: children.to_vec(),
            prev: (0..len).map(|i| i.checked_sub(1)).collect(),
            next: (0..len).map(|i| (i + 1 < len).then_some(i + 1)).collect(),
            head: (len > 0).then_some(0),
        }
    }

    fn unlink(&mut self, pos: usize) {
        let (prev, next) = (self.prev[pos], self.next[pos]);
        match prev {
            Some(p) => self.next[p] = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.prev[n] = prev;
        }
    }

    fn collect(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while let Some(pos) = cursor {
            out.push(self.node[pos]);
            cursor = self.next[pos];
        }
        out
    }
}
