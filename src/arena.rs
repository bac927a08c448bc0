//! Match tree arena
//!
//! Nodes produced by a single match call live in one [`MatchArena`]: a flat
//! node array, a shared child-id pool, and a string pool for merged token
//! text. Nodes are small `Copy` values holding pool indices, so building and
//! discarding a tree is a handful of `Vec` allocations rather than one per
//! node.
//!
//! Token text normally aliases the input by span; only merged tokens (where
//! noise was coalesced out of the visible text) copy characters into the
//! string pool.

/// Index of a node within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena's node array
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a token's visible text lives
#[derive(Debug, Clone, Copy)]
pub enum TokenText {
    /// The input slice covered by the token's span
    Input,
    /// A string-pool range holding merged text
    Merged { start: u32, len: u32 },
}

/// A child-id range in the arena's child pool
#[derive(Debug, Clone, Copy)]
pub struct ChildRange {
    start: u32,
    len: u32,
}

impl ChildRange {
    /// An empty range
    pub const EMPTY: ChildRange = ChildRange { start: 0, len: 0 };
}

/// One node of a match tree
#[derive(Debug, Clone, Copy)]
pub enum Node {
    /// A pattern match
    Token {
        /// Pattern id within the grammar
        pattern: u16,
        /// Byte offset of the span start
        start: u32,
        /// Byte length of the span
        length: u32,
        /// Visible text source
        text: TokenText,
    },
    /// A fragment match with its ordered children
    Fragment {
        /// Fragment id within the grammar
        fragment: u16,
        /// Byte offset of the span start
        start: u32,
        /// Byte length of the span
        length: u32,
        /// Children in the arena's child pool
        children: ChildRange,
    },
}

impl Node {
    /// Byte offset of the node's span start
    #[inline]
    pub fn start(&self) -> u32 {
        match *self {
            Node::Token { start, .. } | Node::Fragment { start, .. } => start,
        }
    }

    /// Byte length of the node's span
    #[inline]
    pub fn length(&self) -> u32 {
        match *self {
            Node::Token { length, .. } | Node::Fragment { length, .. } => length,
        }
    }
}

/// Arena owning every node of one match call
#[derive(Debug, Default)]
pub struct MatchArena {
    nodes: Vec<Node>,
    child_pool: Vec<NodeId>,
    string_pool: String,
}

impl MatchArena {
    /// An empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty arena sized for an input of `len` bytes
    ///
    /// Token-dense grammars produce on the order of one node per few input
    /// bytes; starting near that avoids rehash-free growth doubling.
    pub fn for_input(len: usize) -> Self {
        let nodes = (len / 4).clamp(16, 64 * 1024);
        Self {
            nodes: Vec::with_capacity(nodes),
            child_pool: Vec::with_capacity(nodes),
            string_pool: String::new(),
        }
    }

    /// Number of nodes in the arena
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id
    #[inline]
    pub fn node(&self, id: NodeId) -> Node {
        self.nodes[id.index()]
    }

    /// Children of a fragment node; empty for tokens
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes[id.index()] {
            Node::Fragment { children, .. } => {
                let start = children.start as usize;
                &self.child_pool[start..start + children.len as usize]
            }
            Node::Token { .. } => &[],
        }
    }

    /// Visible text of a token node
    ///
    /// `input` must be the text the match ran over. Fragment nodes yield the
    /// raw input slice of their span.
    pub fn text<'a>(&'a self, id: NodeId, input: &'a str) -> &'a str {
        match self.nodes[id.index()] {
            Node::Token {
                text: TokenText::Merged { start, len },
                ..
            } => &self.string_pool[start as usize..(start + len) as usize],
            node => {
                let start = node.start() as usize;
                &input[start..start + node.length() as usize]
            }
        }
    }

    /// Append a token whose visible text is its input span
    pub fn push_token(&mut self, pattern: u16, start: u32, length: u32) -> NodeId {
        self.push_node(Node::Token {
            pattern,
            start,
            length,
            text: TokenText::Input,
        })
    }

    /// Append a merged token, interning its visible text
    pub fn push_merged_token(
        &mut self,
        pattern: u16,
        start: u32,
        length: u32,
        text: &str,
    ) -> NodeId {
        let pool_start = self.string_pool.len() as u32;
        self.string_pool.push_str(text);
        self.push_node(Node::Token {
            pattern,
            start,
            length,
            text: TokenText::Merged {
                start: pool_start,
                len: text.len() as u32,
            },
        })
    }

    /// Append a fragment node, copying `children` into the child pool
    pub fn push_fragment(
        &mut self,
        fragment: u16,
        start: u32,
        length: u32,
        children: &[NodeId],
    ) -> NodeId {
        let range = self.intern_children(children);
        self.push_node(Node::Fragment {
            fragment,
            start,
            length,
            children: range,
        })
    }

    /// Replace a fragment node's span and children in place
    ///
    /// Used by expression reshaping, which rebuilds a parent's child list
    /// after its nodes already exist. The old child range becomes pool
    /// garbage, which the arena's lifetime makes acceptable.
    pub fn reshape_fragment(&mut self, id: NodeId, start: u32, length: u32, children: &[NodeId]) {
        let range = self.intern_children(children);
        if let Node::Fragment {
            start: s,
            length: l,
            children: c,
            ..
        } = &mut self.nodes[id.index()]
        {
            *s = start;
            *l = length;
            *c = range;
        }
    }

    fn intern_children(&mut self, children: &[NodeId]) -> ChildRange {
        if children.is_empty() {
            return ChildRange::EMPTY;
        }
        let start = self.child_pool.len() as u32;
        self.child_pool.extend_from_slice(children);
        ChildRange {
            start,
            len: children.len() as u32,
        }
    }

    #[inline]
    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_text_aliases_input() {
        let mut arena = MatchArena::new();
        let id = arena.push_token(0, 2, 3);
        assert_eq!(arena.text(id, "xxabcyy"), "abc");
        assert!(arena.children(id).is_empty());
    }

    #[test]
    fn test_merged_token_uses_pool() {
        let mut arena = MatchArena::new();
        let id = arena.push_merged_token(0, 0, 3, "aa");
        // Span covers the noise, visible text does not.
        assert_eq!(arena.node(id).length(), 3);
        assert_eq!(arena.text(id, "aba"), "aa");
    }

    #[test]
    fn test_fragment_children() {
        let mut arena = MatchArena::new();
        let a = arena.push_token(0, 0, 1);
        let b = arena.push_token(1, 1, 1);
        let frag = arena.push_fragment(0, 0, 2, &[a, b]);
        assert_eq!(arena.children(frag), &[a, b]);
        assert_eq!(arena.text(frag, "ab"), "ab");
    }

    #[test]
    fn test_reshape_fragment() {
        let mut arena = MatchArena::new();
        let a = arena.push_token(0, 0, 1);
        let b = arena.push_token(1, 1, 1);
        let frag = arena.push_fragment(0, 0, 1, &[a]);
        arena.reshape_fragment(frag, 0, 2, &[b, a]);
        assert_eq!(arena.children(frag), &[b, a]);
        assert_eq!(arena.node(frag).length(), 2);
    }
}
