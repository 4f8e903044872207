use crate::error::{Error, Result};

use super::kt;
use super::prob::Prob;
use super::weighting::weigh;

/// Deepest context tree a session may build (2^21 - 1 nodes).
pub const MAX_DEPTH: u8 = 20;

const PATH_LEN: usize = MAX_DEPTH as usize + 1;

/// One context of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    depth: u8,
    // Bit `k` is the bit observed `k + 1` steps before the predicted one.
    code: u32,
    c0: u64,
    c1: u64,
    kt: Prob,
    p: Prob,
}

impl Node {
    fn new(depth: u8, code: u32) -> Self {
        Node {
            depth,
            code,
            c0: 0,
            c1: 0,
            kt: Prob::ONE,
            p: Prob::ONE,
        }
    }

    /// Length of the context this node stands for.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// The context as a bit string, oldest bit first.
    pub fn code(&self) -> String {
        (0..self.depth)
            .rev()
            .map(|age| if (self.code >> age) & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    /// `(c0, c1)`: zeros and ones seen right after this context.
    pub fn counts(&self) -> (u64, u64) {
        (self.c0, self.c1)
    }

    /// This node's own KT block estimate.
    pub fn kt(&self) -> Prob {
        self.kt
    }

    /// Weighted block probability.
    pub fn p(&self) -> Prob {
        self.p
    }
}

/// The last `depth` observed bits.
///
/// Starts as all zeros, so the first bits of a stream are predicted as if the
/// stream were preceded by zero bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    bits: u64,
    depth: u8,
}

impl Window {
    /// An all-zero window of the given length.
    pub fn new(depth: u8) -> Self {
        Window { bits: 0, depth }
    }

    /// Drop the oldest bit and append `bit`.
    pub fn push(&mut self, bit: u8) {
        let mask = (1u64 << self.depth) - 1;
        self.bits = ((self.bits << 1) | (bit & 1) as u64) & mask;
    }

    /// The bit observed `age` steps ago; age 0 is the most recent one.
    pub fn bit(&self, age: u8) -> u8 {
        ((self.bits >> age) & 1) as u8
    }

    /// Window length.
    pub fn depth(&self) -> u8 {
        self.depth
    }
}

/// A full binary context tree of fixed depth, stored as an arena in heap
/// order: the root is node 0 and node `i` has children `2i + 1` (context
/// extended by a 1) and `2i + 2` (extended by a 0).
#[derive(Debug, Clone)]
pub struct ContextTree {
    depth: u8,
    nodes: Vec<Node>,
}

impl ContextTree {
    /// Allocate a fresh tree with `2^(depth+1) - 1` nodes.
    ///
    /// # Errors
    /// Returns `Error::InvalidDepth` unless `1 <= depth <= MAX_DEPTH`.
    pub fn new(depth: u8) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(Error::InvalidDepth {
                depth: depth as u32,
                max: MAX_DEPTH,
            });
        }

        let count = (1usize << (depth as usize + 1)) - 1;
        let mut nodes = Vec::with_capacity(count);
        nodes.push(Node::new(0, 0));
        for i in 1..count {
            let parent = &nodes[(i - 1) / 2];
            let (depth, mut code) = (parent.depth + 1, parent.code);
            if i % 2 == 1 {
                code |= 1 << parent.depth;
            }
            nodes.push(Node::new(depth, code));
        }

        Ok(ContextTree { depth, nodes })
    }

    /// Maximum context length.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// All nodes, in arena order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The empty context.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Arena indices of the `(left, right)` children, or `None` for a leaf.
    pub fn children(&self, index: usize) -> Option<(usize, usize)> {
        if self.nodes[index].depth == self.depth {
            None
        } else {
            Some((2 * index + 1, 2 * index + 2))
        }
    }

    /// Look a node up by its context, oldest bit first.
    pub fn node_for_context(&self, context: &[u8]) -> Option<&Node> {
        if context.len() > self.depth as usize {
            return None;
        }
        let index = context
            .iter()
            .rev()
            .fold(0, |index, &bit| child(index, bit));
        self.nodes.get(index)
    }

    /// Probability that the next bit is 1 in the context `window`.
    ///
    /// Evaluates the weighted probability the root would have after a 1 and
    /// divides by the current one. Nothing is mutated; always inside (0, 1).
    pub fn predict(&self, window: &Window) -> Prob {
        let path = self.path(window);
        let depth = self.depth as usize;

        let leaf = &self.nodes[path[depth]];
        let mut p1 = leaf.kt.mul(kt::update_factor(leaf.c0, leaf.c1, 1));
        for d in (0..depth).rev() {
            let node = &self.nodes[path[d]];
            let sibling = &self.nodes[sibling(path[d + 1])];
            let kt1 = node.kt.mul(kt::update_factor(node.c0, node.c1, 1));
            p1 = weigh(kt1, p1, sibling.p);
        }

        p1.div(self.root().p)
    }

    /// Count `bit` along the path selected by `window`, leaf first.
    pub fn update(&mut self, window: &Window, bit: u8) {
        let path = self.path(window);

        for d in (0..=self.depth as usize).rev() {
            let index = path[d];
            let children = self
                .children(index)
                .map(|(left, right)| (self.nodes[left].p, self.nodes[right].p));

            let node = &mut self.nodes[index];
            node.kt = node.kt.mul(kt::update_factor(node.c0, node.c1, bit));
            if bit == 0 {
                node.c0 += 1;
            } else {
                node.c1 += 1;
            }
            node.p = match children {
                Some((left, right)) => weigh(node.kt, left, right),
                None => node.kt,
            };
        }
    }

    fn path(&self, window: &Window) -> [usize; PATH_LEN] {
        debug_assert_eq!(window.depth(), self.depth);
        let mut path = [0usize; PATH_LEN];
        for age in 0..self.depth {
            path[age as usize + 1] = child(path[age as usize], window.bit(age));
        }
        path
    }
}

fn child(index: usize, bit: u8) -> usize {
    if bit == 1 {
        2 * index + 1
    } else {
        2 * index + 2
    }
}

fn sibling(index: usize) -> usize {
    if index % 2 == 1 {
        index + 1
    } else {
        index - 1
    }
}

/// A context tree together with the window that addresses it.
///
/// Encoder and decoder each own one and drive it with the same bits, so they
/// stay in lock-step.
#[derive(Debug, Clone)]
pub struct CtwModel {
    tree: ContextTree,
    window: Window,
}

impl CtwModel {
    /// Fresh model of the given depth.
    pub fn new(depth: u8) -> Result<Self> {
        Ok(CtwModel {
            tree: ContextTree::new(depth)?,
            window: Window::new(depth),
        })
    }

    /// Probability that the next bit is 1.
    pub fn predict(&self) -> Prob {
        self.tree.predict(&self.window)
    }

    /// Learn `bit` and slide the window.
    pub fn observe(&mut self, bit: u8) {
        self.tree.update(&self.window, bit);
        self.window.push(bit);
    }

    /// The underlying tree.
    pub fn tree(&self) -> &ContextTree {
        &self.tree
    }

    /// Current context.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// `-log2` of the root's weighted probability: the code length an ideal
    /// coder would need for everything observed so far.
    pub fn ideal_code_length(&self) -> f64 {
        -self.tree.root().p.log2()
    }
}
