//! Result nodes: one state in the multi-switch search DAG, plus the arena
//! that owns them.
//!
//! A node records a header-space, the port it was found at, an ordered
//! trace of rules applied to reach it, and a parent pointer. Parent edges
//! form an immutable in-tree rooted at the original inputs; many children
//! may share one parent, so parents are kept alive by reference count.
//! Rather than a hand-rolled `pthread_mutex_t` per node, nodes live in an
//! arena addressed by opaque [`NodeId`]s, and each node's live-child count
//! is a plain [`AtomicUsize`] — the arena's own mutex serializes the
//! structural mutation (insertion, removal) that a concurrent ref-count
//! hitting zero triggers.

use crate::hs::HeaderSpace;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Index into a [`NodeArena`]. Only meaningful relative to the arena that
/// produced it.
pub type NodeId = usize;

/// One entry in a node's rule trace: the transfer function it came from
/// (its prefix, e.g. a switch name) and the rule index within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub tf_prefix: Option<String>,
    pub rule: u32,
}

struct NodeSlot {
    hs: HeaderSpace,
    port: u32,
    trace: Vec<RuleRef>,
    trace_cap: usize,
    parent: Option<NodeId>,
    refs: AtomicUsize,
}

/// Owns every live result node. Nodes are only ever removed via [`NodeArena::free`]
/// once their live-child count reaches zero.
pub struct NodeArena {
    slots: Mutex<Vec<Option<NodeSlot>>>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Create a root node with no parent, reserving room for `trace_cap`
    /// rule-trace entries.
    pub fn create(&self, hs: HeaderSpace, port: u32, trace_cap: usize) -> NodeId {
        let mut slots = self.slots.lock().unwrap();
        slots.push(Some(NodeSlot {
            hs,
            port,
            trace: Vec::with_capacity(trace_cap),
            trace_cap,
            parent: None,
            refs: AtomicUsize::new(0),
        }));
        slots.len() - 1
    }

    /// Create a node extending `src`: takes a reference on `src` (bumping
    /// its live-child count), with a fresh header-space and port. When
    /// `append` is set, the new node's trace starts as a copy of `src`'s.
    pub fn extend(&self, src: NodeId, hs: HeaderSpace, port: u32, append: bool) -> NodeId {
        let (trace, trace_cap) = {
            let slots = self.slots.lock().unwrap();
            let s = slots[src].as_ref().expect("extend of freed node");
            let trace = if append {
                s.trace.clone()
            } else {
                Vec::with_capacity(s.trace_cap)
            };
            (trace, s.trace_cap)
        };
        let id = {
            let mut slots = self.slots.lock().unwrap();
            slots.push(Some(NodeSlot {
                hs,
                port,
                trace,
                trace_cap,
                parent: Some(src),
                refs: AtomicUsize::new(0),
            }));
            slots.len() - 1
        };
        let slots = self.slots.lock().unwrap();
        slots[src]
            .as_ref()
            .expect("extend of freed node")
            .refs
            .fetch_add(1, Ordering::AcqRel);
        id
    }

    /// Re-point `id`'s parent to `new_parent`: takes a reference on
    /// `new_parent` and releases the one held on the old parent, cascading
    /// that old parent's own removal if it no longer has any live children.
    /// Mirrors the original's `ref_add`, which always re-parents a result
    /// directly to the switch-boundary node it was found from, flattening
    /// out whatever intra-switch pipeline or topology-apply intermediate
    /// produced it.
    pub fn reparent(&self, id: NodeId, new_parent: NodeId) {
        let old_parent = {
            let mut slots = self.slots.lock().unwrap();
            let s = slots[id].as_mut().expect("reparent of freed node");
            s.parent.replace(new_parent)
        };
        {
            let slots = self.slots.lock().unwrap();
            slots[new_parent]
                .as_ref()
                .expect("reparent onto freed node")
                .refs
                .fetch_add(1, Ordering::AcqRel);
        }
        if let Some(old) = old_parent {
            {
                let slots = self.slots.lock().unwrap();
                slots[old]
                    .as_ref()
                    .expect("old parent freed while child still live")
                    .refs
                    .fetch_sub(1, Ordering::AcqRel);
            }
            self.free(old);
        }
    }

    pub fn rule_add(&self, id: NodeId, tf_prefix: Option<String>, rule: u32) {
        let mut slots = self.slots.lock().unwrap();
        let s = slots[id].as_mut().expect("rule_add on freed node");
        assert!(
            s.trace.len() < s.trace_cap,
            "rule trace capacity exceeded"
        );
        s.trace.push(RuleRef { tf_prefix, rule });
    }

    pub fn hs(&self, id: NodeId) -> HeaderSpace {
        let slots = self.slots.lock().unwrap();
        slots[id].as_ref().expect("access to freed node").hs.clone()
    }

    pub fn with_hs<R>(&self, id: NodeId, f: impl FnOnce(&HeaderSpace) -> R) -> R {
        let slots = self.slots.lock().unwrap();
        f(&slots[id].as_ref().expect("access to freed node").hs)
    }

    pub fn port(&self, id: NodeId) -> u32 {
        let slots = self.slots.lock().unwrap();
        slots[id].as_ref().expect("access to freed node").port
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let slots = self.slots.lock().unwrap();
        slots[id].as_ref().expect("access to freed node").parent
    }

    pub fn trace(&self, id: NodeId) -> Vec<RuleRef> {
        let slots = self.slots.lock().unwrap();
        slots[id].as_ref().expect("access to freed node").trace.clone()
    }

    /// Print the parent chain as `-> Port: <p>, Rules: <tf>_<rule>, ...`
    /// lines, root first, matching the original's recursive `res_print`.
    pub fn print_chain(&self, id: NodeId) -> String {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            chain.push(n);
            cur = self.parent(n);
        }
        chain.reverse();
        let mut out = String::new();
        for n in chain {
            let port = self.port(n);
            let trace = self.trace(n);
            out.push_str(&format!("-> Port: {port}"));
            if !trace.is_empty() {
                out.push_str(", Rules: ");
                let parts: Vec<String> = trace
                    .iter()
                    .map(|r| format!("{}_{}", r.tf_prefix.as_deref().unwrap_or(""), r.rule))
                    .collect();
                out.push_str(&parts.join(", "));
            }
            out.push('\n');
        }
        out
    }

    /// Release this node. If it has no live children, it is deallocated
    /// immediately and its parent's live-child count is decremented,
    /// continuing up the chain for as long as that also hits zero. Safe to
    /// call concurrently from multiple worker threads.
    pub fn free(&self, node: NodeId) {
        let mut cur = Some(node);
        while let Some(id) = cur {
            let at_zero = {
                let slots = self.slots.lock().unwrap();
                match slots[id].as_ref() {
                    Some(s) => s.refs.load(Ordering::Acquire) == 0,
                    None => return,
                }
            };
            if !at_zero {
                return;
            }
            let parent = {
                let mut slots = self.slots.lock().unwrap();
                match slots[id].take() {
                    Some(s) => s.parent,
                    None => return,
                }
            };
            cur = match parent {
                Some(p) => {
                    let slots = self.slots.lock().unwrap();
                    slots[p]
                        .as_ref()
                        .expect("parent freed while child still live")
                        .refs
                        .fetch_sub(1, Ordering::AcqRel);
                    Some(p)
                }
                None => None,
            };
        }
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO of node ids: per-switch work queues and per-worker result lists.
/// `VecDeque` already gives O(1) push/pop/append, so there is no need for
/// the original's hand-rolled singly-linked list with a tail pointer.
#[derive(Debug, Default)]
pub struct NodeList {
    items: VecDeque<NodeId>,
}

impl NodeList {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, id: NodeId) {
        self.items.push_back(id);
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        self.items.pop_front()
    }

    /// Move all of `other`'s items onto the end of `self`, leaving `other`
    /// empty. O(1).
    pub fn concat(&mut self, other: &mut NodeList) {
        self.items.append(&mut other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::BitVal;
    use crate::array::Cube;

    #[test]
    fn root_has_no_parent_and_frees_cleanly() {
        let arena = NodeArena::new();
        let hs = HeaderSpace::new(1);
        let root = arena.create(hs, 100, 0);
        assert_eq!(arena.parent(root), None);
        arena.free(root);
    }

    #[test]
    fn extend_bumps_parent_refs_and_free_chains_up() {
        let arena = NodeArena::new();
        let root = arena.create(HeaderSpace::new(1), 100, 0);
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let child = arena.extend(root, hs, 200, true);
        assert_eq!(arena.parent(child), Some(root));

        // root still has a live child, so freeing it is a no-op for now.
        arena.free(root);
        assert_eq!(arena.port(root), 100);

        // freeing the last child drops root's refcount to zero and frees it.
        arena.free(child);
    }

    #[test]
    fn reparent_moves_the_ref_and_frees_an_orphaned_old_parent() {
        let arena = NodeArena::new();
        let old_parent = arena.create(HeaderSpace::new(1), 100, 0);
        let new_parent = arena.create(HeaderSpace::new(1), 200, 0);
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let child = arena.extend(old_parent, hs, 300, true);
        assert_eq!(arena.parent(child), Some(old_parent));

        arena.reparent(child, new_parent);
        assert_eq!(arena.parent(child), Some(new_parent));

        // old_parent had no other live children, so reparenting already
        // freed it; freeing it again is a harmless no-op.
        arena.free(old_parent);
        assert_eq!(arena.port(new_parent), 200);

        arena.free(child);
        arena.free(new_parent);
    }

    #[test]
    fn rule_trace_accumulates_in_order() {
        let arena = NodeArena::new();
        let root = arena.create(HeaderSpace::new(1), 1, 4);
        arena.rule_add(root, Some("sw1".to_string()), 0);
        arena.rule_add(root, Some("sw1".to_string()), 2);
        let trace = arena.trace(root);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].rule, 2);
    }

    #[test]
    fn node_list_concat_preserves_order() {
        let mut a = NodeList::new();
        a.push(1);
        a.push(2);
        let mut b = NodeList::new();
        b.push(3);
        a.concat(&mut b);
        assert!(b.is_empty());
        let items: Vec<_> = a.iter().copied().collect();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
