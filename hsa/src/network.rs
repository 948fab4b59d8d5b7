//! A network of transfer functions: the topology TF (index 0) plus one TF
//! per switch, multiplexed by the port encoding convention
//! `switch = port / 100_000 - 1`, where `port + 20_000` denotes the output
//! side of a switch's own port.

use crate::error::{HsaError, Result};
use crate::node::{NodeArena, NodeId, NodeList};
use crate::tf::Tf;

const SWITCH_ID: u32 = 100_000;
const OUTPUT_ID: u32 = 20_000;

/// `tfs[0]` is the topology TF; `tfs[i + 1]` is switch `i`'s own TF.
pub struct Network {
    tfs: Vec<Tf>,
    stages: usize,
}

impl Network {
    pub fn new(topology: Tf, switches: Vec<Tf>, stages: usize) -> Self {
        let mut tfs = Vec::with_capacity(switches.len() + 1);
        tfs.push(topology);
        tfs.extend(switches);
        Self { tfs, stages }
    }

    pub fn num_switches(&self) -> usize {
        self.tfs.len() - 1
    }

    pub fn topology(&self) -> &Tf {
        &self.tfs[0]
    }

    pub fn switch(&self, sw: usize) -> Result<&Tf> {
        self.tfs.get(sw + 1).ok_or(HsaError::SwitchOutOfRange(sw))
    }

    /// Find a TF by its trace prefix (the topology TF's prefix is `None`).
    /// Used by the backward walk to resolve a rule-trace entry back to the
    /// rule it came from.
    pub fn tf_by_prefix(&self, prefix: Option<&str>) -> Option<&Tf> {
        self.tfs.iter().find(|tf| tf.prefix.as_deref() == prefix)
    }

    /// Decode a port's owning switch index.
    pub fn sw_of_port(&self, port: u32) -> Result<usize> {
        let idx = port / SWITCH_ID;
        if idx == 0 {
            return Err(HsaError::SwitchOutOfRange(0));
        }
        let sw = (idx - 1) as usize;
        if sw >= self.num_switches() {
            return Err(HsaError::SwitchOutOfRange(sw));
        }
        Ok(sw)
    }

    pub fn is_output_side(port: u32) -> bool {
        port % SWITCH_ID >= OUTPUT_ID
    }

    pub fn output_side_of(port: u32) -> u32 {
        port + OUTPUT_ID
    }

    /// Run `cur`'s switch through its full internal pipeline (`stages`
    /// rounds of `tf_apply`, the first non-appending and the rest
    /// appending), then drop any result that loops back to the same port's
    /// output side. Every intermediate node produced along the way —
    /// except those returned — is freed.
    pub fn ntf_apply(&self, arena: &NodeArena, in_node: NodeId, sw: usize) -> Result<NodeList> {
        let tf = self.switch(sw)?;
        let mut queue = tf.apply(arena, in_node, false)?;
        for _ in 0..self.stages.saturating_sub(1) {
            let mut nextq = NodeList::new();
            while let Some(cur) = queue.pop() {
                let mut tmp = tf.apply(arena, cur, true)?;
                nextq.concat(&mut tmp);
                arena.free(cur);
            }
            queue = nextq;
        }

        let self_output = Self::output_side_of(arena.port(in_node));
        let mut kept = NodeList::new();
        while let Some(cur) = queue.pop() {
            if arena.port(cur) == self_output {
                arena.free(cur);
            } else {
                kept.push(cur);
            }
        }
        Ok(kept)
    }

    /// Run the internal pipeline of `in_node`'s switch, but short-circuit
    /// any node whose port is in `search_ports` straight into the result
    /// list instead of continuing the pipeline on it.
    pub fn ntf_search(
        &self,
        arena: &NodeArena,
        in_node: NodeId,
        search_ports: Option<&[u32]>,
    ) -> Result<NodeList> {
        let sw = self.sw_of_port(arena.port(in_node))?;
        let tf = self.switch(sw)?;
        let mut queue = tf.apply(arena, in_node, false)?;
        let mut found = NodeList::new();
        for _ in 0..self.stages.saturating_sub(1) {
            let mut nextq = NodeList::new();
            while let Some(cur) = queue.pop() {
                if search_ports.is_some_and(|sp| sp.contains(&arena.port(cur))) {
                    found.push(cur);
                } else {
                    let mut tmp = tf.apply(arena, cur, true)?;
                    nextq.concat(&mut tmp);
                    arena.free(cur);
                }
            }
            queue = nextq;
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BitVal, Cube};
    use crate::hs::HeaderSpace;
    use crate::tf::{PortRef, Rule};

    fn passthrough_tf(in_port: u32, out_port: u32) -> Tf {
        Tf::new(
            None,
            vec![Rule {
                idx: 0,
                in_port: PortRef::Exact(in_port),
                out_port: Some(PortRef::Exact(out_port)),
                match_: None,
                mask: None,
                rewrite: None,
                deps: vec![],
            }],
            vec![],
        )
    }

    #[test]
    fn single_stage_switch_passes_through() {
        let topology = Tf::new(None, vec![], vec![]);
        let sw = passthrough_tf(100_001, 100_002);
        let net = Network::new(topology, vec![sw], 1);

        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let root = arena.create(hs, 100_001, 4);

        let out = net.ntf_apply(&arena, root, 0).unwrap();
        assert_eq!(out.len(), 1);
        let node = *out.iter().next().unwrap();
        assert_eq!(arena.port(node), 100_002);
    }

    #[test]
    fn result_looping_back_to_own_output_is_dropped() {
        let topology = Tf::new(None, vec![], vec![]);
        let sw = passthrough_tf(100_001, Network::output_side_of(100_001));
        let net = Network::new(topology, vec![sw], 1);

        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let root = arena.create(hs, 100_001, 4);

        let out = net.ntf_apply(&arena, root, 0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn sw_of_port_decodes_switch_index() {
        let topology = Tf::new(None, vec![], vec![]);
        let net = Network::new(topology, vec![Tf::new(None, vec![], vec![])], 1);
        assert_eq!(net.sw_of_port(100_001).unwrap(), 0);
        assert!(net.sw_of_port(200_001).is_err());
    }
}
