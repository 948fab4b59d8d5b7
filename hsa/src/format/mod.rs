//! External-collaborator concerns: the `.tf` text format and the packed
//! `.dat` binary format. Neither the ternary algebra, the header-space set
//! algebra, the transfer-function engine, nor the reachability search
//! depends on this module — it exists so `gen`/`reach` have something to
//! compile and load.

pub mod binary;
pub mod text;
