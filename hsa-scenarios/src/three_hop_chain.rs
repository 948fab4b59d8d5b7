//! Stress case: four switches in a straight line, with a rewrite at the
//! third hop. Exercises the full parallel search (no target ports, no hop
//! cap) terminating cleanly over several link hops while a header
//! transformation is carried along the provenance chain.

use hsa::array::Cube;
use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
pub const IN_PORT: u32 = 100_001;
pub const OUT_PORT: u32 = 400_002;

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
    let topo = Tf::new(
        None,
        vec![
            Rule {
                idx: 1,
                ..link(200_002, 300_001)
            },
            Rule {
                idx: 2,
                ..link(300_002, 400_001)
            },
            link(100_002, 200_001),
        ],
        vec![],
    );
    let a = Tf::new(Some("a".to_string()), vec![link(IN_PORT, 100_002)], vec![]);
    let b = Tf::new(Some("b".to_string()), vec![link(200_001, 200_002)], vec![]);
    // Clears the low nibble on the way through.
    let c = Tf::new(
        Some("c".to_string()),
        vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(300_001),
            out_port: Some(PortRef::Exact(300_002)),
            match_: Some(Cube::from_str("xxxxxxxx").unwrap()),
            mask: Some(Cube::from_str("11110000").unwrap()),
            rewrite: Some(Cube::from_str("00000000").unwrap()),
            deps: vec![],
        }],
        vec![],
    );
    let d = Tf::new(Some("d".to_string()), vec![link(400_001, OUT_PORT)], vec![]);
    Network::new(topo, vec![a, b, c, d], 1)
}
