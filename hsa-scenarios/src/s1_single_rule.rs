//! S1: single switch, one rule `in=1 match=xxxxxxxx out=2`.
//! Input (all-x, 1). Expected: one result at port 2 with HS all-x.

use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
// Spec's literal port "1"/"2" translated into switch 0's own port range.
pub const IN_PORT: u32 = 100_001;
pub const OUT_PORT: u32 = 100_002;

pub fn network() -> Network {
    let topo = Tf::new(None, vec![], vec![]);
    let sw = Tf::new(
        Some("sw1".to_string()),
        vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(IN_PORT),
            out_port: Some(PortRef::Exact(OUT_PORT)),
            match_: None,
            mask: None,
            rewrite: None,
            deps: vec![],
        }],
        vec![],
    );
    Network::new(topo, vec![sw], 1)
}
