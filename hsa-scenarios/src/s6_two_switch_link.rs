//! S6: two-switch link: rule at switch 1 forwards to output 100002,
//! topology rule links 100002->200001. Input (all-x, 100001). Expected:
//! one result at the egress of switch 2 with HS all-x.

use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
pub const IN_PORT: u32 = 100_001;
pub const OUT_PORT: u32 = 200_002;

fn link(in_port: u32, out_port: u32) -> Rule {
    Rule {
        idx: 0,
        in_port: PortRef::Exact(in_port),
        out_port: Some(PortRef::Exact(out_port)),
        match_: None,
        mask: None,
        rewrite: None,
        deps: vec![],
    }
}

pub fn network() -> Network {
    let topo = Tf::new(None, vec![link(100_002, 200_001)], vec![]);
    let sw1 = Tf::new(Some("sw1".to_string()), vec![link(IN_PORT, 100_002)], vec![]);
    let sw2 = Tf::new(Some("sw2".to_string()), vec![link(200_001, OUT_PORT)], vec![]);
    Network::new(topo, vec![sw1, sw2], 1)
}
