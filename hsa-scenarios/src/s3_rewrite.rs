//! S3: rewrite rule `match=xxxxxxxx, mask=11110000, rewrite=00000000,
//! out=2`. Input cube `11111111` at port 1. Expected: result at port 2
//! with HS `11110000`.

use hsa::array::Cube;
use hsa::network::Network;
use hsa::tf::{PortRef, Rule, Tf};

pub const HEADER_LEN: usize = 1;
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
            match_: Some(Cube::from_str("xxxxxxxx").unwrap()),
            mask: Some(Cube::from_str("11110000").unwrap()),
            rewrite: Some(Cube::from_str("00000000").unwrap()),
            deps: vec![],
        }],
        vec![],
    );
    Network::new(topo, vec![sw], 1)
}
