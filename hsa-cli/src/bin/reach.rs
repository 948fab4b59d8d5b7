//! `reach <in_port> [<out_port>...]`: forward (or one-step) reachability
//! search over a compiled network, printing each result's provenance chain
//! and header-space. See spec §6 for the full flag set.

use anyhow::{Context, Result};
use clap::Parser;
use hsa::array::{BitVal, Cube};
use hsa::format::binary;
use hsa::hs::HeaderSpace;
use hsa::node::NodeArena;
use hsa::reach::{self, SearchConfig};
use hsa::tables::Tables;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Input port.
    in_port: u32,

    /// Target output ports. Empty accepts any port as a result.
    out_ports: Vec<u32>,

    /// Report loops (a port repeating on its own parent chain) instead of
    /// genuine egress results.
    #[clap(long = "loop")]
    find_loop: bool,

    /// Ingress header cube (default: all-x).
    #[clap(short = 'i', long = "ih")]
    ingress_header: Option<String>,

    /// Egress header cube, intersected into each result at print time.
    #[clap(long = "oh")]
    egress_header: Option<String>,

    /// Single-switch search instead of the full network search.
    #[clap(short = 'o', long = "one-step")]
    one_step: bool,

    /// Require at least this many hops, including the topology TF.
    #[clap(short = 'c', long = "hops")]
    hop_count: Option<u32>,

    /// Also run the backward walk on every result, writing one JSON line
    /// per result to `data/out-inverted.json`.
    #[clap(long)]
    backward: bool,

    /// Compiled network file.
    #[clap(long, default_value = "data/net.dat")]
    data: PathBuf,
}

#[derive(Serialize)]
struct CubeJson {
    cube: String,
    diff: Vec<String>,
}

#[derive(Serialize)]
struct HsJson {
    cubes: Vec<CubeJson>,
}

fn hs_to_json(hs: &HeaderSpace) -> HsJson {
    HsJson {
        cubes: hs
            .elems()
            .iter()
            .map(|e| CubeJson {
                cube: e.cube.to_str(false),
                diff: e.diff.iter().map(|d| d.to_str(false)).collect(),
            })
            .collect(),
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let compiled = binary::load(&opts.data)
        .with_context(|| format!("loading compiled network {}", opts.data.display()))?;
    let header_len = compiled.header_len;
    let tables = Tables::new(header_len, compiled.network);

    let ingress = match &opts.ingress_header {
        Some(s) => Cube::from_str(s)?,
        None => Cube::new(header_len, BitVal::X),
    };
    let mut hs = HeaderSpace::new(header_len);
    hs.add(ingress);

    let arena = NodeArena::new();
    // Generous bound on how many rule-trace entries a single search chain
    // can accumulate across every switch and topology hop it passes through.
    const TRACE_CAP: usize = 256;
    let input = tables.create_input(&arena, hs, opts.in_port, TRACE_CAP)?;

    let start = Instant::now();

    let results: Vec<_> = if opts.one_step {
        let ports = (!opts.out_ports.is_empty()).then_some(opts.out_ports.as_slice());
        tables
            .network()
            .ntf_search(&arena, input, ports)?
            .iter()
            .copied()
            .collect()
    } else {
        let config = SearchConfig {
            target_ports: (!opts.out_ports.is_empty()).then(|| opts.out_ports.clone()),
            hop_cap: opts.hop_count,
            find_loop: opts.find_loop,
        };
        reach::search(tables.network(), &arena, vec![input], &config)?
            .iter()
            .copied()
            .collect()
    };

    let egress_filter = opts
        .egress_header
        .as_deref()
        .map(Cube::from_str)
        .transpose()?
        .unwrap_or_else(|| Cube::new(header_len, BitVal::X));

    let mut inverted_out = opts
        .backward
        .then(|| {
            fs::create_dir_all("data")?;
            fs::File::create("data/out-inverted.json")
        })
        .transpose()?;

    for &node in &results {
        let Some(shown) = arena.with_hs(node, |h| h.isect_arr(&egress_filter))? else {
            continue;
        };
        println!("{}", arena.print_chain(node));
        println!("{}", shown.to_str());

        if let Some(f) = inverted_out.as_mut() {
            let preimage = reach::backward_walk(tables.network(), &arena, node, &egress_filter)?;
            writeln!(f, "{}", serde_json::to_string(&hs_to_json(&preimage))?)?;
        }
    }

    eprintln!("{} result(s) in {:?}", results.len(), start.elapsed());
    Ok(())
}
