//! `gen <netname>`: compiles `<tf_dir>/<netname>/*.tf` and `topology.tf`
//! into `<out_dir>/<netname>.dat`.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hsa::format::{binary, text};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Network name: reads `<tf_dir>/<netname>/`, writes `<out_dir>/<netname>.dat`.
    netname: String,

    #[clap(long, default_value = "tf")]
    tf_dir: PathBuf,

    #[clap(long, default_value = "data")]
    out_dir: PathBuf,

    /// Print each compiled TF's rule count to stderr as it's processed.
    #[clap(long)]
    show_rules: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let net_dir = opts.tf_dir.join(&opts.netname);

    let stages_path = net_dir.join("stages");
    let stages = text::parse_stages(
        &fs::read_to_string(&stages_path)
            .with_context(|| format!("reading {}", stages_path.display()))?,
        &stages_path.to_string_lossy(),
    )?;

    let topo_path = net_dir.join("topology.tf");
    let topo_text = fs::read_to_string(&topo_path)
        .with_context(|| format!("reading {}", topo_path.display()))?;
    let topo_parsed = text::parse_tf(&topo_text, &topo_path.to_string_lossy())?;
    let header_len = topo_parsed.header_len;
    let topology = text::to_tf(&topo_parsed)?;

    let mut tf_paths: Vec<_> = fs::read_dir(&net_dir)
        .with_context(|| format!("reading directory {}", net_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "tf")
                && p.file_name().is_some_and(|n| n != "topology.tf")
        })
        .collect();
    tf_paths.sort();

    let mut switches = Vec::with_capacity(tf_paths.len());
    for path in &tf_paths {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let parsed = text::parse_tf(&contents, &path.to_string_lossy())?;
        if parsed.header_len != header_len {
            return Err(anyhow!(
                "{}: header length {} does not match topology's {}",
                path.display(),
                parsed.header_len,
                header_len
            ));
        }
        let tf = text::to_tf(&parsed)?;
        if opts.show_rules {
            eprintln!("-- {} ({} rules)", path.display(), tf.rules().len());
        }
        switches.push(tf);
    }

    fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("creating {}", opts.out_dir.display()))?;
    let out_path = opts.out_dir.join(format!("{}.dat", opts.netname));
    binary::compile_to_file(&out_path, header_len, stages, &topology, &switches)?;
    eprintln!(
        "wrote {} ({} switches, {} stages)",
        out_path.display(),
        switches.len(),
        stages
    );
    Ok(())
}
