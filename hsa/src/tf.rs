//! Transfer functions: a prioritized rule table mapping `(header-space,
//! port)` to zero or more `(header-space, port)` results, plus its inverse.
//!
//! Priority is encoded structurally: rules for a given inport are tried in
//! file order, and a rule's `deps` list names lower-priority rules whose
//! match it must be subtracted from its own header-space before matching —
//! this is the "applied-set" trick (`deps_diff`) that avoids needing an
//! explicit numeric priority field.

use crate::array::Cube;
use crate::error::Result;
use crate::hs::HeaderSpace;
use crate::node::{NodeArena, NodeId, NodeList};
use std::collections::HashMap;

/// A single port, or an index into the owning [`Tf`]'s port-group table
/// (the runtime analogue of the original's negative port encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRef {
    Exact(u32),
    Group(usize),
}

/// A lower-priority rule whose match must be excluded, optionally only when
/// the input arrived on a particular port (or port group).
#[derive(Debug, Clone)]
pub struct Dep {
    pub rule: u32,
    pub match_: Cube,
    pub port: Option<PortRef>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub idx: u32,
    pub in_port: PortRef,
    /// `None` marks a terminal rule (e.g. a drop): it consumes priority but
    /// never produces an output.
    pub out_port: Option<PortRef>,
    /// `None` means an unconditional forward/topology rule: the whole
    /// input header-space passes through unchanged.
    pub match_: Option<Cube>,
    pub mask: Option<Cube>,
    pub rewrite: Option<Cube>,
    pub deps: Vec<Dep>,
}

/// A transfer function: one switch's (or the topology's) rule table.
#[derive(Debug, Clone)]
pub struct Tf {
    pub prefix: Option<String>,
    rules: Vec<Rule>,
    port_rules: HashMap<u32, Vec<usize>>,
    group_rules: Vec<usize>,
    port_groups: Vec<Vec<u32>>,
}

impl Tf {
    /// Build a `Tf` from its rule list and port-group table. Rules are
    /// partitioned by inport: those with an exact inport are grouped by
    /// port (processed first, in the order given), those with a group
    /// inport are processed afterward, also in the order given — mirroring
    /// the two-phase scan in the original's `tf_apply`.
    pub fn new(prefix: Option<String>, rules: Vec<Rule>, port_groups: Vec<Vec<u32>>) -> Self {
        let mut port_rules: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut group_rules = Vec::new();
        for (i, r) in rules.iter().enumerate() {
            match r.in_port {
                PortRef::Exact(p) => port_rules.entry(p).or_default().push(i),
                PortRef::Group(_) => group_rules.push(i),
            }
        }
        Self {
            prefix,
            rules,
            port_rules,
            group_rules,
            port_groups,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn port_groups(&self) -> &[Vec<u32>] {
        &self.port_groups
    }

    fn port_match(&self, port: u32, spec: PortRef) -> bool {
        match spec {
            PortRef::Exact(p) => p == port,
            PortRef::Group(g) => self.port_groups[g].iter().any(|&p| p == port),
        }
    }

    /// Apply every rule of this transfer function to the node's current
    /// `(header-space, port)`, producing the union of all rules' results.
    pub fn apply(&self, arena: &NodeArena, in_node: NodeId, append: bool) -> Result<NodeList> {
        let in_port = arena.port(in_node);
        let mut res = NodeList::new();
        let mut applied: Vec<u32> = Vec::new();

        if let Some(idxs) = self.port_rules.get(&in_port) {
            for &i in idxs {
                let mut tmp = self.rule_apply(&self.rules[i], arena, in_node, append, &mut applied)?;
                res.concat(&mut tmp);
            }
        }
        for &i in &self.group_rules {
            let r = &self.rules[i];
            if !self.port_match(in_port, r.in_port) {
                continue;
            }
            let mut tmp = self.rule_apply(r, arena, in_node, append, &mut applied)?;
            res.concat(&mut tmp);
        }
        Ok(res)
    }

    fn rule_apply(
        &self,
        r: &Rule,
        arena: &NodeArena,
        in_node: NodeId,
        append: bool,
        applied: &mut Vec<u32>,
    ) -> Result<NodeList> {
        let mut out = NodeList::new();
        let in_port = arena.port(in_node);

        if r.out_port.is_none() {
            applied.push(r.idx);
        }
        let Some(out_port) = r.out_port else {
            return Ok(out);
        };
        if let PortRef::Exact(p) = out_port {
            if p == in_port {
                return Ok(out);
            }
        }

        let hs = match &r.match_ {
            None => arena.hs(in_node),
            Some(m) => {
                let Some(mut hs) = arena.with_hs(in_node, |h| h.isect_arr(m))? else {
                    return Ok(out);
                };
                if !r.deps.is_empty() {
                    self.deps_diff(&mut hs, in_port, &r.deps, Some(applied))?;
                }
                if !hs.compact_m(r.mask.as_ref()) {
                    return Ok(out);
                }
                if let Some(mask) = &r.mask {
                    hs.rewrite(mask, r.rewrite.as_ref().expect("mask implies rewrite"))?;
                }
                hs
            }
        };

        self.port_append_res(&mut out, r, arena, in_node, out_port, append, hs);
        if !out.is_empty() {
            applied.push(r.idx);
        }
        Ok(out)
    }

    /// Subtract each applicable dependency's match from `hs`. When
    /// `applied` is given, a dependency only applies if its rule index was
    /// already recorded as applied earlier in this same `apply()` call
    /// (forward priority); when `None`, every dependency applies
    /// unconditionally (inverse direction has no notion of "already
    /// applied").
    fn deps_diff(
        &self,
        hs: &mut HeaderSpace,
        port: u32,
        deps: &[Dep],
        applied: Option<&[u32]>,
    ) -> Result<()> {
        for dep in deps {
            if let Some(app) = applied {
                if !app.contains(&dep.rule) {
                    continue;
                }
            }
            if let Some(p) = dep.port {
                if !self.port_match(port, p) {
                    continue;
                }
            }
            hs.diff(&dep.match_)?;
        }
        Ok(())
    }

    /// Create one child node per port in `out_port` (skipping the inbound
    /// port itself), each carrying `hs` and this rule appended to its
    /// trace. Returns the number of nodes created.
    fn port_append_res(
        &self,
        out: &mut NodeList,
        r: &Rule,
        arena: &NodeArena,
        in_node: NodeId,
        out_port: PortRef,
        append: bool,
        hs: HeaderSpace,
    ) -> usize {
        let in_port = arena.port(in_node);
        let ports: &[u32] = match out_port {
            PortRef::Exact(ref p) => std::slice::from_ref(p),
            PortRef::Group(g) => &self.port_groups[g],
        };
        let mut n = 0;
        for &p in ports {
            if p == in_port {
                continue;
            }
            let id = arena.extend(in_node, hs.clone(), p, append);
            arena.rule_add(id, self.prefix.clone(), r.idx);
            out.push(id);
            n += 1;
        }
        n
    }

    /// Apply the inverse of a single rule: given a node observed at (one
    /// of) the rule's output ports, reconstruct the header-space(s) that
    /// would have produced it at the rule's input port(s).
    pub fn rule_inv_apply(
        &self,
        r: &Rule,
        arena: &NodeArena,
        in_node: NodeId,
        append: bool,
    ) -> Result<NodeList> {
        let mut out = NodeList::new();
        let in_port = arena.port(in_node);

        let Some(out_port) = r.out_port else {
            return Ok(out);
        };
        match out_port {
            PortRef::Exact(p) if p != in_port => return Ok(out),
            PortRef::Group(g) if !self.port_groups[g].iter().any(|&q| q == in_port) => {
                return Ok(out)
            }
            _ => {}
        }

        let mut inv_mask = None;
        let mut inv_rw = None;
        let isect_mat: Option<Cube> = if let Some(mask) = &r.mask {
            let m = r
                .match_
                .as_ref()
                .expect("rewrite rule without a match is malformed");
            let im = mask.not();
            let new_rw = im.and(r.rewrite.as_ref().expect("mask implies rewrite"))?;
            let masked_mat = m.and(mask)?;
            let mat = new_rw.or(&masked_mat)?;
            let rw = m.and(&im)?;
            inv_mask = Some(im);
            inv_rw = Some(rw);
            Some(mat)
        } else {
            r.match_.clone()
        };

        let hs = match &r.match_ {
            None => arena.hs(in_node),
            Some(_) => {
                let m = isect_mat.as_ref().expect("match implies isect_mat");
                let Some(mut hs) = arena.with_hs(in_node, |h| h.isect_arr(m))? else {
                    return Ok(out);
                };
                if let (Some(mask), Some(rw)) = (&inv_mask, &inv_rw) {
                    hs.rewrite(mask, rw)?;
                }
                if !r.deps.is_empty() {
                    self.deps_diff(&mut hs, in_port, &r.deps, None)?;
                }
                if !hs.compact_m(r.mask.as_ref()) {
                    return Ok(out);
                }
                hs
            }
        };

        self.port_append_res(&mut out, r, arena, in_node, r.in_port, append, hs);
        Ok(out)
    }

    /// Apply the inverse transfer function: the union over every rule
    /// whose output includes the node's current port.
    pub fn inv_apply(&self, arena: &NodeArena, in_node: NodeId, append: bool) -> Result<NodeList> {
        let mut res = NodeList::new();
        for r in &self.rules {
            let mut tmp = self.rule_inv_apply(r, arena, in_node, append)?;
            res.concat(&mut tmp);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::BitVal;

    fn c(s: &str) -> Cube {
        Cube::from_str(s).unwrap()
    }

    fn simple_fwd_tf() -> Tf {
        // one rule: in port 1 -> out port 2, unconditional forward
        let rules = vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(1),
            out_port: Some(PortRef::Exact(2)),
            match_: None,
            mask: None,
            rewrite: None,
            deps: vec![],
        }];
        Tf::new(Some("sw1".to_string()), rules, vec![])
    }

    #[test]
    fn forward_rule_produces_one_child_at_out_port() {
        let tf = simple_fwd_tf();
        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let root = arena.create(hs, 1, 4);

        let res = tf.apply(&arena, root, true).unwrap();
        assert_eq!(res.len(), 1);
        let child = *res.iter().next().unwrap();
        assert_eq!(arena.port(child), 2);
    }

    #[test]
    fn rule_matching_own_port_produces_nothing() {
        let rules = vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(1),
            out_port: Some(PortRef::Exact(1)),
            match_: None,
            mask: None,
            rewrite: None,
            deps: vec![],
        }];
        let tf = Tf::new(None, rules, vec![]);
        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(Cube::new(1, BitVal::X));
        let root = arena.create(hs, 1, 4);
        let res = tf.apply(&arena, root, true).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn match_rule_filters_header_space() {
        let rules = vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(1),
            out_port: Some(PortRef::Exact(2)),
            match_: Some(c("00000000")),
            mask: None,
            rewrite: None,
            deps: vec![],
        }];
        let tf = Tf::new(None, rules, vec![]);
        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(c("11111111"));
        let root = arena.create(hs, 1, 4);
        let res = tf.apply(&arena, root, true).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn rewrite_rule_inverts_cleanly() {
        let mask = c("00001111");
        let rewrite = c("00000000");
        let rules = vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(1),
            out_port: Some(PortRef::Exact(2)),
            match_: Some(c("xxxxxxxx")),
            mask: Some(mask),
            rewrite: Some(rewrite),
            deps: vec![],
        }];
        let tf = Tf::new(None, rules, vec![]);
        let arena = NodeArena::new();
        let mut hs = HeaderSpace::new(1);
        hs.add(c("11111111"));
        let root = arena.create(hs, 1, 4);

        let fwd = tf.apply(&arena, root, true).unwrap();
        assert_eq!(fwd.len(), 1);
        let child = *fwd.iter().next().unwrap();
        let child_hs = arena.hs(child);
        assert_eq!(child_hs.elems()[0].cube.to_str(false), "11110000");

        let inv = tf.inv_apply(&arena, child, true).unwrap();
        assert_eq!(inv.len(), 1);
        let back = *inv.iter().next().unwrap();
        assert_eq!(arena.port(back), 1);
    }
}
