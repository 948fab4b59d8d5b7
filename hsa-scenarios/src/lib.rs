//! Hand-built `Network` fixtures for the engine's end-to-end scenarios
//! (S1-S6 from spec §8, plus a couple of extra stress cases), mirroring
//! the one-file-per-scenario layout used for P4 pipeline fixtures in the
//! teacher's own test crate.
//!
//! Each module exposes a `network()` constructor plus the header length
//! and ingress port the scenario is defined against; `hsa/tests/scenarios.rs`
//! drives these through `hsa::reach`/`hsa::tables` and checks the literal
//! expectations from the spec.

pub mod s1_single_rule;
pub mod s2_priority_pair;
pub mod s3_rewrite;
pub mod s4_loop;
pub mod s5_hop_cap;
pub mod s6_two_switch_link;

pub mod diamond;
pub mod three_hop_chain;
