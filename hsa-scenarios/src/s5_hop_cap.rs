//! S5: hop cap, target port specified; only results whose parent-chain
//! depth matches the cap appear.
//!
//! A straight three-switch chain A->B->C. With a target of C's own out
//! port and no hop cap, the one accepted node sits at chain depth 5 (two
//! topology hops plus three switch outputs, minus the root itself). A cap
//! of 6 (`chain_depth == 6 - 1`) admits it; a cap of 4 admits nothing,
//! since no accept point in this chain sits at depth 3. This exercises the
//! same exact-depth filtering spec's literal two-hop illustration does,
//! against a chain long enough to show a cap rejecting a real result.

use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
pub const IN_PORT: u32 = 100_001;
pub const TARGET_PORT: u32 = 300_002;
pub const ADMITTING_HOP_CAP: u32 = 6;
pub const REJECTING_HOP_CAP: u32 = 4;

fn link(idx: u32, in_port: u32, out_port: u32) -> Rule {
    Rule {
        idx,
        in_port: PortRef::Exact(in_port),
        out_port: Some(PortRef::Exact(out_port)),
        match_: None,
        mask: None,
        rewrite: None,
        deps: vec![],
    }
}

pub fn network() -> Network {
    let topo = Tf::new(
        None,
        vec![link(0, 100_002, 200_001), link(1, 200_002, 300_001)],
        vec![],
    );
    let a = Tf::new(Some("a".to_string()), vec![link(0, IN_PORT, 100_002)], vec![]);
    let b = Tf::new(Some("b".to_string()), vec![link(0, 200_001, 200_002)], vec![]);
    let c = Tf::new(
        Some("c".to_string()),
        vec![link(0, 300_001, TARGET_PORT)],
        vec![],
    );
    Network::new(topo, vec![a, b, c], 1)
}
