//! Parallel reachability search: one worker thread per switch, draining a
//! shared set of per-switch queues until every worker is simultaneously
//! idle, plus the backward walk that inverts a result's rule trace to
//! recover its ingress preimage.

use crate::array::Cube;
use crate::error::Result;
use crate::hs::HeaderSpace;
use crate::network::Network;
use crate::node::{NodeArena, NodeId, NodeList};
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};

/// Search parameters: which output ports count as hits, how many hops are
/// required, and whether to surface loops instead of genuine egress
/// results.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// `None` accepts any output port as a result candidate.
    pub target_ports: Option<Vec<u32>>,
    /// `None`, or `Some(0)`, accepts any parent-chain depth. `Some(n)` with
    /// `n > 0` requires the node's pre-topology chain depth to equal `n - 1`
    /// (the final topology hop brings it to `n`).
    pub hop_cap: Option<u32>,
    /// When set, genuine egress results are suppressed; only nodes whose
    /// port repeats somewhere on their own ancestry are recorded.
    pub find_loop: bool,
}

struct QueueState {
    queues: Vec<VecDeque<NodeId>>,
    waiters: Vec<bool>,
}

struct Shared<'a> {
    state: Mutex<QueueState>,
    condvars: Vec<Condvar>,
    results: Mutex<NodeList>,
    network: &'a Network,
    arena: &'a NodeArena,
    config: &'a SearchConfig,
}

fn chain_depth(arena: &NodeArena, node: NodeId) -> u32 {
    let mut depth = 0;
    let mut cur = arena.parent(node);
    while let Some(n) = cur {
        depth += 1;
        cur = arena.parent(n);
    }
    depth
}

/// True if `port` equals the port of `node` or of any of its ancestors.
fn ancestry_has_port(arena: &NodeArena, node: NodeId, port: u32) -> bool {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if arena.port(n) == port {
            return true;
        }
        cur = arena.parent(n);
    }
    false
}

impl<'a> Shared<'a> {
    fn pop_or_wait(&self, sw: usize) -> Option<NodeId> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(n) = guard.queues[sw].pop_front() {
                guard.waiters[sw] = false;
                return Some(n);
            }
            guard.waiters[sw] = true;
            if guard.waiters.iter().all(|&w| w) {
                for cv in &self.condvars {
                    cv.notify_all();
                }
                return None;
            }
            guard = self.condvars[sw].wait(guard).unwrap();
        }
    }

    fn enqueue(&self, buffers: HashMap<usize, NodeList>) {
        if buffers.is_empty() {
            return;
        }
        let mut touched = Vec::with_capacity(buffers.len());
        {
            let mut guard = self.state.lock().unwrap();
            for (dest, mut list) in buffers {
                while let Some(n) = list.pop() {
                    guard.queues[dest].push_back(n);
                }
                guard.waiters[dest] = false;
                touched.push(dest);
            }
        }
        for dest in touched {
            self.condvars[dest].notify_all();
        }
    }

    fn process(&self, sw: usize, cur: NodeId) -> Result<()> {
        let ntf_result = self.network.ntf_apply(self.arena, cur, sw)?;
        let mut buffers: HashMap<usize, NodeList> = HashMap::new();

        for ntf_cur in ntf_result.iter().copied().collect::<Vec<_>>() {
            let target_match = match &self.config.target_ports {
                Some(targets) => targets.contains(&self.arena.port(ntf_cur)),
                None => true,
            };
            let hop_ok = match self.config.hop_cap {
                None | Some(0) => true,
                Some(cap) => chain_depth(self.arena, ntf_cur) == cap - 1,
            };
            let accept = target_match && !self.config.find_loop && hop_ok;

            if accept {
                // A result is always re-parented directly to the
                // switch-boundary node it was found from, flattening out
                // whatever intra-switch pipeline stages produced it.
                self.arena.reparent(ntf_cur, cur);
                // With no target list every switch output is a result, and
                // still gets forwarded below: an untargeted search reports
                // every hop's egress, not just dead ends.
                self.results.lock().unwrap().push(ntf_cur);
                if self.config.target_ports.is_some() {
                    continue;
                }
            }

            let topo_children = self.network.topology().apply(self.arena, ntf_cur, true)?;
            for child in topo_children.iter().copied().collect::<Vec<_>>() {
                if ancestry_has_port(self.arena, cur, self.arena.port(child)) {
                    if self.config.find_loop {
                        self.arena.reparent(child, cur);
                        self.results.lock().unwrap().push(child);
                    } else {
                        self.arena.free(child);
                    }
                } else {
                    // Every forwarded child is also re-parented directly to
                    // `cur`, so the next switch's own boundary node sits
                    // one hop above the previous one, not above the
                    // topology-apply intermediate that produced it.
                    self.arena.reparent(child, cur);
                    let dest = self.network.sw_of_port(self.arena.port(child))?;
                    buffers.entry(dest).or_default().push(child);
                }
            }

            if !accept {
                self.arena.free(ntf_cur);
            }
        }

        self.arena.free(cur);
        self.enqueue(buffers);
        Ok(())
    }
}

/// Run the full parallel search: one thread per non-topology switch,
/// seeded with `inputs`, until every switch is simultaneously idle.
/// Returns the accumulated result nodes (ownership passes to the caller,
/// who should eventually free them via the same [`NodeArena`]).
pub fn search(
    network: &Network,
    arena: &NodeArena,
    inputs: Vec<NodeId>,
    config: &SearchConfig,
) -> Result<NodeList> {
    let n = network.num_switches();
    let mut queues = vec![VecDeque::new(); n];
    let waiters = vec![false; n];
    for input in inputs {
        let sw = network.sw_of_port(arena.port(input))?;
        queues[sw].push_back(input);
    }
    let condvars = (0..n).map(|_| Condvar::new()).collect();

    let shared = Shared {
        state: Mutex::new(QueueState { queues, waiters }),
        condvars,
        results: Mutex::new(NodeList::new()),
        network,
        arena,
        config,
    };

    std::thread::scope(|scope| {
        for sw in 0..n {
            let shared = &shared;
            scope.spawn(move || loop {
                match shared.pop_or_wait(sw) {
                    Some(cur) => shared.process(sw, cur).expect("switch worker failed"),
                    None => break,
                }
            });
        }
    });

    Ok(shared.results.into_inner().unwrap())
}

/// Invert `out_node`'s rule trace (and the chain of nodes it descends from)
/// to recover the ingress header-space that would have produced it,
/// restricted to `out_array` at the egress side.
pub fn backward_walk(
    network: &Network,
    arena: &NodeArena,
    out_node: NodeId,
    out_array: &Cube,
) -> Result<HeaderSpace> {
    let len = out_array.len();
    let mut result = HeaderSpace::new(len);

    let seed_hs = match arena.with_hs(out_node, |h| h.isect_arr(out_array))? {
        Some(hs) => hs,
        None => return Ok(result),
    };
    let mut candidates = vec![arena.create(seed_hs, arena.port(out_node), 1)];

    let mut cur_node = Some(out_node);
    while let Some(node) = cur_node {
        let trace = arena.trace(node);
        for rule_ref in trace.iter().rev() {
            if candidates.is_empty() {
                break;
            }
            let Some(tf) = network.tf_by_prefix(rule_ref.tf_prefix.as_deref()) else {
                continue;
            };
            let Some(rule) = tf.rules().iter().find(|r| r.idx == rule_ref.rule) else {
                continue;
            };
            let mut next = Vec::new();
            for cand in candidates.drain(..) {
                let inv = tf.rule_inv_apply(rule, arena, cand, false)?;
                next.extend(inv.iter().copied());
                arena.free(cand);
            }
            candidates = next;
        }

        match arena.parent(node) {
            Some(parent) => {
                let parent_port = arena.port(parent);
                let parent_hs = arena.hs(parent);
                let mut kept = Vec::new();
                for cand in candidates.drain(..) {
                    if arena.port(cand) != parent_port {
                        arena.free(cand);
                        continue;
                    }
                    let cand_hs = arena.hs(cand);
                    let merged = cand_hs.isect_a(&parent_hs)?;
                    arena.free(cand);
                    if !merged.is_empty() {
                        kept.push(arena.create(merged, parent_port, 1));
                    }
                }
                candidates = kept;
                if candidates.is_empty() {
                    return Ok(result);
                }
                cur_node = Some(parent);
            }
            None => {
                for cand in candidates.drain(..) {
                    for elem in arena.hs(cand).elems() {
                        result.add(elem.cube.clone());
                    }
                    arena.free(cand);
                }
                return Ok(result);
            }
        }
    }
    Ok(result)
}
