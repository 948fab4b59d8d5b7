//! Stress case: A fans out to B and C, which both rejoin at D. Exercises
//! the provenance DAG's shared-ancestor shape and the backward walk's
//! need to recombine candidates across two distinct parent chains that
//! both lead back to the same root.

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

fn link2(idx: u32, in_port: u32, out_port: u32) -> Rule {
    Rule {
        idx,
        ..link(in_port, out_port)
    }
}

/// Switch 0 (A) has two rules: one to B, one to C, both matching on
/// disjoint halves of the header so results stay distinguishable.
pub fn network() -> Network {
    use hsa::array::Cube;

    let topo = Tf::new(
        None,
        vec![
            link2(0, 100_002, 200_001), // A -> B
            link2(1, 100_003, 300_001), // A -> C
            link2(2, 200_002, 400_001), // B -> D
            link2(3, 300_002, 400_001), // C -> D
        ],
        vec![],
    );
    let a = Tf::new(
        Some("a".to_string()),
        vec![
            Rule {
                idx: 0,
                in_port: PortRef::Exact(IN_PORT),
                out_port: Some(PortRef::Exact(100_002)),
                match_: Some(Cube::from_str("0xxxxxxx").unwrap()),
                mask: None,
                rewrite: None,
                deps: vec![],
            },
            Rule {
                idx: 1,
                in_port: PortRef::Exact(IN_PORT),
                out_port: Some(PortRef::Exact(100_003)),
                match_: Some(Cube::from_str("1xxxxxxx").unwrap()),
                mask: None,
                rewrite: None,
                deps: vec![],
            },
        ],
        vec![],
    );
    let b = Tf::new(Some("b".to_string()), vec![link(200_001, 200_002)], vec![]);
    let c = Tf::new(Some("c".to_string()), vec![link(300_001, 300_002)], vec![]);
    let d = Tf::new(Some("d".to_string()), vec![link(400_001, OUT_PORT)], vec![]);
    Network::new(topo, vec![a, b, c, d], 1)
}
