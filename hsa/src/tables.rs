//! `Tables`: everything loaded from one compiled network, as a single
//! explicit value instead of the original's singleton globals
//! (`data_file`, `data_arrs`, ...). A process can hold more than one
//! `Tables` at once (e.g. while recompiling one network and searching
//! another) without any hidden shared state between them.

use crate::error::{HsaError, Result};
use crate::hs::HeaderSpace;
use crate::network::Network;
use crate::node::{NodeArena, NodeId};

pub struct Tables {
    header_len: usize,
    network: Network,
}

impl Tables {
    pub fn new(header_len: usize, network: Network) -> Self {
        Self { header_len, network }
    }

    /// Header length in bytes (`L`); every cube in every rule and input
    /// header-space must agree with this.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Create a root search input at `port`, validating that `hs`'s length
    /// matches this network's header length and that `port` resolves to a
    /// known switch.
    pub fn create_input(
        &self,
        arena: &NodeArena,
        hs: HeaderSpace,
        port: u32,
        trace_cap: usize,
    ) -> Result<NodeId> {
        if hs.len() != self.header_len {
            return Err(HsaError::LengthMismatch {
                a: self.header_len,
                b: hs.len(),
            });
        }
        self.network.sw_of_port(port)?;
        Ok(arena.create(hs, port, trace_cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::Tf;

    #[test]
    fn create_input_rejects_length_mismatch() {
        let topology = Tf::new(None, vec![], vec![]);
        let network = Network::new(topology, vec![Tf::new(None, vec![], vec![])], 1);
        let tables = Tables::new(1, network);
        let arena = NodeArena::new();

        let wrong_len = HeaderSpace::new(2);
        assert!(tables
            .create_input(&arena, wrong_len, 100_001, 4)
            .is_err());
    }

    #[test]
    fn create_input_rejects_unknown_port() {
        let topology = Tf::new(None, vec![], vec![]);
        let network = Network::new(topology, vec![Tf::new(None, vec![], vec![])], 1);
        let tables = Tables::new(1, network);
        let arena = NodeArena::new();

        let hs = HeaderSpace::new(1);
        assert!(tables.create_input(&arena, hs, 999_999, 4).is_err());
    }
}
