//! S2: two rules at port 1: `r1 match=0xxxxxxx out=2`, `r2 match=xxxxxxxx
//! out=3`, r2 affected by r1. Input (all-x, 1). Expected: port 2 HS =
//! `0xxxxxxx`; port 3 HS = `1xxxxxxx`.

use hsa::array::Cube;
use hsa::network::Network;
use hsa::tf::{Dep, PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
pub const IN_PORT: u32 = 100_001;
pub const OUT_PORT_R1: u32 = 100_002;
pub const OUT_PORT_R2: u32 = 100_003;

pub fn network() -> Network {
    let topo = Tf::new(None, vec![], vec![]);
    let r1 = Rule {
        idx: 0,
        in_port: PortRef::Exact(IN_PORT),
        out_port: Some(PortRef::Exact(OUT_PORT_R1)),
        match_: Some(Cube::from_str("0xxxxxxx").unwrap()),
        mask: None,
        rewrite: None,
        deps: vec![],
    };
    let r2 = Rule {
        idx: 1,
        in_port: PortRef::Exact(IN_PORT),
        out_port: Some(PortRef::Exact(OUT_PORT_R2)),
        match_: Some(Cube::from_str("xxxxxxxx").unwrap()),
        mask: None,
        rewrite: None,
        deps: vec![Dep {
            rule: 0,
            match_: Cube::from_str("0xxxxxxx").unwrap(),
            port: Some(PortRef::Exact(IN_PORT)),
        }],
    };
    let sw = Tf::new(Some("sw1".to_string()), vec![r1, r2], vec![]);
    Network::new(topo, vec![sw], 1)
}
