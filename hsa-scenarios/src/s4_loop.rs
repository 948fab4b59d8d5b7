//! S4: loop topology A->B->A; input at A. With `find_loop`, one result
//! with an A->B->A parent chain. Without, zero results.
//!
//! Neither switch's own out port is a genuine network egress here — both
//! A's and B's rules forward straight into the other switch via topology,
//! so there is nothing for a target-less search to "accept" on the way
//! around except the loop itself. Run this scenario with a target port
//! outside the topology (e.g. [`UNREACHABLE_PORT`]) so the non-loop accept
//! path never fires and the only way to produce a result is the loop check.

use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
pub const IN_PORT: u32 = 100_001;
/// Not owned by any switch in this topology; see module doc.
pub const UNREACHABLE_PORT: u32 = 900_001;

pub fn network() -> Network {
    let topo = Tf::new(
        None,
        vec![
            Rule {
                idx: 0,
                in_port: PortRef::Exact(100_002),
                out_port: Some(PortRef::Exact(200_001)),
                match_: None,
                mask: None,
                rewrite: None,
                deps: vec![],
            },
            Rule {
                idx: 1,
                in_port: PortRef::Exact(200_002),
                out_port: Some(PortRef::Exact(100_001)),
                match_: None,
                mask: None,
                rewrite: None,
                deps: vec![],
            },
        ],
        vec![],
    );
    let a = Tf::new(
        Some("a".to_string()),
        vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(100_001),
            out_port: Some(PortRef::Exact(100_002)),
            match_: None,
            mask: None,
            rewrite: None,
            deps: vec![],
        }],
        vec![],
    );
    let b = Tf::new(
        Some("b".to_string()),
        vec![Rule {
            idx: 0,
            in_port: PortRef::Exact(200_001),
            out_port: Some(PortRef::Exact(200_002)),
            match_: None,
            mask: None,
            rewrite: None,
            deps: vec![],
        }],
        vec![],
    );
    Network::new(topo, vec![a, b], 1)
}
