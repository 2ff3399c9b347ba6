//! Sorted Sum Tree
//!
//! A map from ordered keys to integer weights where every entry also owns a
//! half-open range of "points". Entry ranges touch but never overlap: the
//! range of a key starts at the sum of the weights of all smaller keys (its
//! offset) and is as long as its weight. Think of it as a segment tree whose
//! segments tile `[0, total)` in key order.
//!
//! Structure:
//! - A plain binary tree. Leaves hold one entry each, branches hold a split
//!   key and exactly two children.
//! - Every node caches the sum of the weights beneath it.
//! - All nodes are stored in a single Vec (no raw pointers), parents are
//!   found through a stored index.
//!
//! Operations, all O(height):
//! - put: descend to a leaf, then update it in place or split it
//! - get: descend, accumulating left-hand sums into the offset
//! - remove: descend, then splice the sibling into the parent's slot
//! - find: descend by point instead of by key
//!
//! The tree is never rebalanced. Its height is whatever the insertion order
//! produces, so ascending inserts degrade it into a list.

use std::fmt;
use std::fmt::Write;

use smallvec::SmallVec;
use tracing::trace;

/// Index into the node array.
type NodeIdx = u32;
/// Sentinel value for no parent / no root.
const NONE: NodeIdx = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    /// A stored entry.
    Leaf,
    /// An internal node. Keys below `children[0]` are `< key`, keys below
    /// `children[1]` are `>= key`.
    Branch([NodeIdx; 2]),
}

#[derive(Clone, Debug)]
struct Node<K> {
    /// Entry key for a leaf, split key for a branch.
    key: K,
    /// Weight for a leaf, sum of both children for a branch.
    value: i64,
    /// Parent node index (NONE for the root).
    parent: NodeIdx,
    kind: Kind,
}

impl<K> Node<K> {
    fn leaf(key: K, weight: i64, parent: NodeIdx) -> Node<K> {
        return Node {
            key,
            value: weight,
            parent,
            kind: Kind::Leaf,
        };
    }
}

/// A weighted index: sorted keys, each owning a range of cumulative weight.
///
/// ```
/// use soseg::WeightedIndex;
///
/// let mut index = WeightedIndex::new();
/// index.put("alice", 3);
/// index.put("bob", 5);
/// index.put("carol", 2);
///
/// assert_eq!(index.total(), 10);
/// assert_eq!(index.get(&"bob"), Some((5, 3)));
/// assert_eq!(index.find(7), Some(&"bob"));
/// assert_eq!(index.find(8), Some(&"carol"));
/// assert_eq!(index.find(10), None);
/// ```
#[derive(Clone)]
pub struct WeightedIndex<K> {
    /// All live nodes. Removed nodes are swapped out, so the Vec stays dense.
    nodes: Vec<Node<K>>,
    /// Root index, NONE when empty.
    root: NodeIdx,
    /// Number of leaves.
    len: usize,
}

impl<K: Ord + Clone> WeightedIndex<K> {
    pub fn new() -> WeightedIndex<K> {
        return WeightedIndex {
            nodes: Vec::new(),
            root: NONE,
            len: 0,
        };
    }

    /// Sum of all weights, O(1).
    #[inline(always)]
    pub fn total(&self) -> i64 {
        if self.root == NONE {
            return 0;
        }
        return self.nodes[self.root as usize].value;
    }

    /// Number of entries, O(1).
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.len;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        trace!(released = self.nodes.len(), "clearing weighted index");
        self.nodes.clear();
        self.root = NONE;
        self.len = 0;
    }

    /// Walk from the root to the leaf whose range of keys covers `key`.
    /// The tree must not be empty.
    #[inline]
    fn descend(&self, key: &K) -> NodeIdx {
        let mut idx = self.root;
        while let Kind::Branch([left, right]) = self.nodes[idx as usize].kind {
            idx = if *key < self.nodes[idx as usize].key { left } else { right };
        }
        return idx;
    }

    /// Add `delta` to `idx` and every ancestor above it.
    #[inline]
    fn propagate(&mut self, mut idx: NodeIdx, delta: i64) {
        while idx != NONE {
            let node = &mut self.nodes[idx as usize];
            node.value += delta;
            idx = node.parent;
        }
    }

    /// Point the child slot of `parent` that holds `old` at `new` instead.
    /// A NONE parent means `old` is the root.
    fn replace_child(&mut self, parent: NodeIdx, old: NodeIdx, new: NodeIdx) {
        if parent == NONE {
            self.root = new;
            return;
        }
        if let Kind::Branch(ref mut children) = self.nodes[parent as usize].kind {
            for child in children.iter_mut() {
                if *child == old {
                    *child = new;
                }
            }
        }
    }

    /// Drop a detached node. The last node moves into the freed slot, so
    /// its parent and children are re-pointed at the new index.
    fn release(&mut self, idx: NodeIdx) {
        self.nodes.swap_remove(idx as usize);
        let moved = self.nodes.len() as NodeIdx;
        if idx == moved {
            return;
        }

        let parent = self.nodes[idx as usize].parent;
        self.replace_child(parent, moved, idx);
        if let Kind::Branch(children) = self.nodes[idx as usize].kind {
            for child in children {
                self.nodes[child as usize].parent = idx;
            }
        }
    }

    /// Insert an entry, or update its weight if the key is already present.
    /// Returns true if a new entry was created.
    ///
    /// Weights are not validated. A zero or negative weight yields an empty
    /// range that [`find`](Self::find) never lands in.
    pub fn put(&mut self, key: K, weight: i64) -> bool {
        if self.root == NONE {
            self.nodes.push(Node::leaf(key, weight, NONE));
            self.root = (self.nodes.len() - 1) as NodeIdx;
            self.len = 1;
            return true;
        }

        let leaf_idx = self.descend(&key);
        let leaf = &mut self.nodes[leaf_idx as usize];

        // Leaf reached
        if leaf.key == key {
            let delta = weight - leaf.value;
            leaf.value = weight;
            let parent = leaf.parent;
            self.propagate(parent, delta);
            return false;
        }

        // Split the leaf: a new branch takes its slot, with the old leaf and
        // the new one as children, smaller key on the left.
        let parent = leaf.parent;
        let existing_weight = leaf.value;
        let new_on_left = key < leaf.key;
        let split = if new_on_left { leaf.key.clone() } else { key.clone() };

        let branch_idx = self.nodes.len() as NodeIdx;
        let new_idx = branch_idx + 1;
        let children = if new_on_left {
            [new_idx, leaf_idx]
        } else {
            [leaf_idx, new_idx]
        };

        self.nodes.push(Node {
            key: split,
            value: existing_weight + weight,
            parent,
            kind: Kind::Branch(children),
        });
        self.nodes.push(Node::leaf(key, weight, branch_idx));
        self.nodes[leaf_idx as usize].parent = branch_idx;

        self.replace_child(parent, leaf_idx, branch_idx);
        self.propagate(parent, weight);
        self.len += 1;

        trace!(len = self.len, "split leaf into branch");
        return true;
    }

    /// Look up an entry, returning `(weight, offset)` where offset is the sum
    /// of the weights of all smaller keys, i.e. the start of its range.
    pub fn get(&self, key: &K) -> Option<(i64, i64)> {
        if self.root == NONE {
            return None;
        }

        let mut idx = self.root;
        let mut offset = 0i64;
        while let Kind::Branch([left, right]) = self.nodes[idx as usize].kind {
            if *key < self.nodes[idx as usize].key {
                idx = left;
            } else {
                offset += self.nodes[left as usize].value;
                idx = right;
            }
        }

        let leaf = &self.nodes[idx as usize];
        if leaf.key != *key {
            return None;
        }
        return Some((leaf.value, offset));
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        return self.get(key).is_some();
    }

    /// Remove an entry. Returns false, without touching the tree, if the key
    /// is not present.
    pub fn remove(&mut self, key: &K) -> bool {
        if self.root == NONE {
            return false;
        }

        let leaf_idx = self.descend(key);
        let leaf = &self.nodes[leaf_idx as usize];
        if leaf.key != *key {
            return false;
        }

        let parent = leaf.parent;
        let weight = leaf.value;
        if parent == NONE {
            self.clear();
            return true;
        }

        // Replace the parent with the leaf's sibling
        let Kind::Branch([left, right]) = self.nodes[parent as usize].kind else {
            unreachable!("the parent of a leaf is always a branch");
        };
        let sibling = if left == leaf_idx { right } else { left };
        let grandparent = self.nodes[parent as usize].parent;

        self.nodes[sibling as usize].parent = grandparent;
        self.replace_child(grandparent, parent, sibling);
        self.propagate(grandparent, -weight);

        // Release the higher index first so the lower one stays put.
        self.release(leaf_idx.max(parent));
        self.release(leaf_idx.min(parent));
        self.len -= 1;

        trace!(len = self.len, "spliced sibling into parent slot");
        return true;
    }

    /// Find the key whose range contains `point`, i.e. the entry with
    /// `offset <= point < offset + weight`. Points outside `[0, total)`
    /// yield None.
    pub fn find(&self, point: i64) -> Option<&K> {
        if self.root == NONE || point < 0 {
            return None;
        }

        let mut idx = self.root;
        let mut offset = 0i64;
        while let Kind::Branch([left, right]) = self.nodes[idx as usize].kind {
            // Point outside the total tree range
            if point > offset + self.nodes[idx as usize].value {
                return None;
            }

            let mid = offset + self.nodes[left as usize].value;
            if point < mid {
                idx = left;
            } else {
                offset = mid;
                idx = right;
            }
        }

        let leaf = &self.nodes[idx as usize];
        if point >= offset + leaf.value {
            return None;
        }
        return Some(&leaf.key);
    }

    /// Iterate over `(key, weight)` in ascending key order.
    pub fn iter(&self) -> Iter<'_, K> {
        let mut stack = SmallVec::new();
        if self.root != NONE {
            stack.push(self.root);
        }
        return Iter { nodes: &self.nodes, stack };
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        return self.iter().map(|(key, _)| key);
    }
}

impl<K: Ord + Clone + fmt::Debug> WeightedIndex<K> {
    /// Render the shape of the tree, one node per line, for debugging.
    /// Branches print as `+ 'split/sum`, leaves as `- 'key/weight`.
    pub fn dump(&self) -> String {
        let mut out = String::from("WeightedIndex\n");
        if self.root == NONE {
            return out;
        }

        let mut stack: Vec<(NodeIdx, usize)> = vec![(self.root, 0)];
        while let Some((idx, depth)) = stack.pop() {
            let node = &self.nodes[idx as usize];
            let marker = match node.kind {
                Kind::Leaf => '-',
                Kind::Branch([left, right]) => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                    '+'
                }
            };
            let _ = writeln!(
                out,
                "{:indent$}{} '{:?}/{}",
                "",
                marker,
                node.key,
                node.value,
                indent = depth * 2
            );
        }
        return out;
    }
}

impl<K: Ord + Clone> Default for WeightedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + fmt::Debug> fmt::Debug for WeightedIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + Clone> Extend<(K, i64)> for WeightedIndex<K> {
    fn extend<I: IntoIterator<Item = (K, i64)>>(&mut self, iter: I) {
        for (key, weight) in iter {
            self.put(key, weight);
        }
    }
}

impl<K: Ord + Clone> FromIterator<(K, i64)> for WeightedIndex<K> {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut index = WeightedIndex::new();
        index.extend(iter);
        index
    }
}

impl<'a, K: Ord + Clone> IntoIterator for &'a WeightedIndex<K> {
    type Item = (&'a K, i64);
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

/// In-order iterator over the entries of a [`WeightedIndex`].
pub struct Iter<'a, K> {
    nodes: &'a [Node<K>],
    /// Nodes still to visit, next on top. Holds at most one pending right
    /// child per level, so 32 slots covers most trees without allocating.
    stack: SmallVec<[NodeIdx; 32]>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (&'a K, i64);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.stack.pop() {
            let node = &self.nodes[idx as usize];
            match node.kind {
                Kind::Leaf => return Some((&node.key, node.value)),
                Kind::Branch([left, right]) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}
