//! Packed binary network format (`.dat`), loaded via `memmap2`.
//!
//! Layout is self-describing and length-prefixed rather than the original's
//! fixed-size packed structs over a `VALID_OFS`-adjusted offset pool: a
//! deduplicated cube pool was a storage optimization over the original's
//! `malloc`'d world, not a semantic requirement, so here each rule carries
//! its cubes inline as their canonical string form (see `Cube::to_str`).
//! Byte layout is therefore not compatible with the original `hassel-c`
//! `.dat` files; this is the documented trade-off spec.md §9 allows
//! ("drop format compatibility entirely and serialize natively").
//!
//! ```text
//! magic      : b"HSA1"
//! header_len : u32
//! stages     : u32
//! ntfs       : u32   (topology + one per switch)
//! tf[0]      : topology TF
//! tf[1..]    : switch TFs, in network order
//! ```
//! Each TF: `opt_str(prefix)`, port-group table, then a rule table; each
//! rule stores its in/out port refs, optional match/mask/rewrite cubes, and
//! its dependency list. Strings and cubes are `u32`-length-prefixed UTF-8.

use crate::array::Cube;
use crate::error::{HsaError, Result};
use crate::network::Network;
use crate::tf::{Dep, PortRef, Rule, Tf};
use std::path::Path;

const MAGIC: &[u8; 4] = b"HSA1";

pub struct CompiledNetwork {
    pub header_len: usize,
    pub stages: usize,
    pub network: Network,
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn write_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.push(1);
            write_str(buf, s);
        }
        None => buf.push(0),
    }
}

fn write_cube(buf: &mut Vec<u8>, cube: &Cube) {
    write_str(buf, &cube.to_str(false));
}

fn write_opt_cube(buf: &mut Vec<u8>, cube: Option<&Cube>) {
    match cube {
        Some(c) => {
            buf.push(1);
            write_cube(buf, c);
        }
        None => buf.push(0),
    }
}

fn write_port_ref(buf: &mut Vec<u8>, p: PortRef) {
    match p {
        PortRef::Exact(port) => {
            buf.push(0);
            write_u32(buf, port);
        }
        PortRef::Group(g) => {
            buf.push(1);
            write_u32(buf, g as u32);
        }
    }
}

fn write_opt_port_ref(buf: &mut Vec<u8>, p: Option<PortRef>) {
    match p {
        Some(p) => {
            buf.push(1);
            write_port_ref(buf, p);
        }
        None => buf.push(0),
    }
}

fn write_tf(buf: &mut Vec<u8>, tf: &Tf) {
    write_opt_str(buf, tf.prefix.as_deref());

    write_u32(buf, tf.port_groups().len() as u32);
    for g in tf.port_groups() {
        write_u32(buf, g.len() as u32);
        for &p in g {
            write_u32(buf, p);
        }
    }

    write_u32(buf, tf.rules().len() as u32);
    for r in tf.rules() {
        write_u32(buf, r.idx);
        write_port_ref(buf, r.in_port);
        write_opt_port_ref(buf, r.out_port);
        write_opt_cube(buf, r.match_.as_ref());
        write_opt_cube(buf, r.mask.as_ref());
        write_opt_cube(buf, r.rewrite.as_ref());
        write_u32(buf, r.deps.len() as u32);
        for d in &r.deps {
            write_u32(buf, d.rule);
            write_cube(buf, &d.match_);
            write_opt_port_ref(buf, d.port);
        }
    }
}

/// Serialize a network to the packed byte layout described above.
pub fn compile(header_len: usize, stages: usize, topology: &Tf, switches: &[Tf]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    write_u32(&mut buf, header_len as u32);
    write_u32(&mut buf, stages as u32);
    write_u32(&mut buf, (switches.len() + 1) as u32);
    write_tf(&mut buf, topology);
    for sw in switches {
        write_tf(&mut buf, sw);
    }
    buf
}

pub fn compile_to_file(
    path: &Path,
    header_len: usize,
    stages: usize,
    topology: &Tf,
    switches: &[Tf],
) -> Result<()> {
    let bytes = compile(header_len, stages, topology, switches);
    std::fs::write(path, bytes)?;
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| HsaError::Format("offset overflow".to_string()))?;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| HsaError::Format("unexpected end of file".to_string()))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    fn str(&mut self) -> Result<&'a str> {
        let len = self.u32()? as usize;
        std::str::from_utf8(self.take(len)?)
            .map_err(|_| HsaError::Format("invalid utf8 in string field".to_string()))
    }

    fn opt_str(&mut self) -> Result<Option<&'a str>> {
        if self.u8()? == 1 {
            Ok(Some(self.str()?))
        } else {
            Ok(None)
        }
    }

    fn cube(&mut self) -> Result<Cube> {
        Cube::from_str(self.str()?)
    }

    fn opt_cube(&mut self) -> Result<Option<Cube>> {
        if self.u8()? == 1 {
            Ok(Some(self.cube()?))
        } else {
            Ok(None)
        }
    }

    fn port_ref(&mut self) -> Result<PortRef> {
        match self.u8()? {
            0 => Ok(PortRef::Exact(self.u32()?)),
            1 => Ok(PortRef::Group(self.u32()? as usize)),
            tag => Err(HsaError::Format(format!("bad port-ref tag {tag}"))),
        }
    }

    fn opt_port_ref(&mut self) -> Result<Option<PortRef>> {
        if self.u8()? == 1 {
            Ok(Some(self.port_ref()?))
        } else {
            Ok(None)
        }
    }
}

fn read_tf(c: &mut Cursor) -> Result<Tf> {
    let prefix = c.opt_str()?.map(str::to_string);

    let group_count = c.u32()? as usize;
    let mut port_groups = Vec::with_capacity(group_count);
    for _ in 0..group_count {
        let n = c.u32()? as usize;
        let mut g = Vec::with_capacity(n);
        for _ in 0..n {
            g.push(c.u32()?);
        }
        port_groups.push(g);
    }

    let rule_count = c.u32()? as usize;
    let mut rules = Vec::with_capacity(rule_count);
    for _ in 0..rule_count {
        let idx = c.u32()?;
        let in_port = c.port_ref()?;
        let out_port = c.opt_port_ref()?;
        let match_ = c.opt_cube()?;
        let mask = c.opt_cube()?;
        let rewrite = c.opt_cube()?;

        let dep_count = c.u32()? as usize;
        let mut deps = Vec::with_capacity(dep_count);
        for _ in 0..dep_count {
            let rule = c.u32()?;
            if rule >= idx {
                return Err(HsaError::DependencyOrder { rule: idx, dep_rule: rule });
            }
            let match_ = c.cube()?;
            let port = c.opt_port_ref()?;
            deps.push(Dep { rule, match_, port });
        }

        rules.push(Rule {
            idx,
            in_port,
            out_port,
            match_,
            mask,
            rewrite,
            deps,
        });
    }

    Ok(Tf::new(prefix, rules, port_groups))
}

/// Memory-map `path` and decode it into an owned [`Network`]. Validates, as
/// it goes, that every dependency's rule index lexically precedes the rule
/// carrying it — the priority-encoding invariant the on-disk format itself
/// does not enforce.
pub fn load(path: &Path) -> Result<CompiledNetwork> {
    let file = std::fs::File::open(path)?;
    // Safety: the mapped file is treated as an immutable byte slice for the
    // duration of this call; nothing else in this process writes to it.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let mut c = Cursor::new(&mmap);

    if c.take(4)? != MAGIC {
        return Err(HsaError::Format("bad magic number".to_string()));
    }
    let header_len = c.u32()? as usize;
    let stages = c.u32()? as usize;
    let ntfs = c.u32()? as usize;
    if ntfs == 0 {
        return Err(HsaError::Format("network has no topology TF".to_string()));
    }

    let topology = read_tf(&mut c)?;
    let mut switches = Vec::with_capacity(ntfs - 1);
    for _ in 0..ntfs - 1 {
        switches.push(read_tf(&mut c)?);
    }

    Ok(CompiledNetwork {
        header_len,
        stages,
        network: Network::new(topology, switches, stages),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::PortRef;

    fn sample_tf(prefix: &str) -> Tf {
        Tf::new(
            Some(prefix.to_string()),
            vec![Rule {
                idx: 0,
                in_port: PortRef::Exact(1),
                out_port: Some(PortRef::Exact(2)),
                match_: Some(Cube::from_str("xxxxxxxx").unwrap()),
                mask: None,
                rewrite: None,
                deps: vec![],
            }],
            vec![],
        )
    }

    #[test]
    fn compile_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.dat");
        let topology = Tf::new(None, vec![], vec![]);
        let switches = vec![sample_tf("sw1")];
        compile_to_file(&path, 1, 2, &topology, &switches).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.header_len, 1);
        assert_eq!(loaded.stages, 2);
        assert_eq!(loaded.network.num_switches(), 1);
        let sw = loaded.network.switch(0).unwrap();
        assert_eq!(sw.prefix.as_deref(), Some("sw1"));
        assert_eq!(sw.rules().len(), 1);
    }

    #[test]
    fn load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dat");
        std::fs::write(&path, b"nope").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_rejects_out_of_order_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_dep.dat");
        let bad_rule = Rule {
            idx: 0,
            in_port: PortRef::Exact(1),
            out_port: Some(PortRef::Exact(2)),
            match_: Some(Cube::from_str("xxxxxxxx").unwrap()),
            mask: None,
            rewrite: None,
            deps: vec![Dep {
                rule: 0,
                match_: Cube::from_str("xxxxxxxx").unwrap(),
                port: None,
            }],
        };
        let topology = Tf::new(None, vec![], vec![]);
        let switches = vec![Tf::new(Some("sw1".to_string()), vec![bad_rule], vec![])];
        compile_to_file(&path, 1, 1, &topology, &switches).unwrap();
        assert!(load(&path).is_err());
    }
}
