//! `.tf` text format: one transfer function per file, a header line
//! followed by `$`-separated rule records, per spec §6. Produces an
//! in-memory [`ParsedTf`] that [`crate::format::binary::compile`] packs
//! into the on-disk layout; never touched directly by the reachability
//! engine itself.

use crate::array::Cube;
use crate::error::{HsaError, Result};
use crate::tf::{Dep, PortRef, Rule, Tf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Fwd,
    Rw,
    Link,
}

#[derive(Debug, Clone)]
pub struct ParsedDep {
    pub rule: u32,
    pub match_: String,
    pub ports: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ParsedRule {
    pub kind: RuleKind,
    pub in_ports: Vec<u32>,
    pub out_ports: Vec<u32>,
    pub match_: Option<String>,
    pub mask: Option<String>,
    pub rewrite: Option<String>,
    pub deps: Vec<ParsedDep>,
}

#[derive(Debug, Clone)]
pub struct ParsedTf {
    pub header_len: usize,
    pub prefix: String,
    pub rules: Vec<ParsedRule>,
}

fn parse_err(file: &str, line: usize, message: impl Into<String>) -> HsaError {
    HsaError::Parse {
        file: file.to_string(),
        line,
        message: message.into(),
    }
}

fn parse_port_list(field: &str, file: &str, line: usize) -> Result<Vec<u32>> {
    let s = field.trim();
    let inner = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| parse_err(file, line, format!("expected port list, got \"{s}\"")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<u32>()
                .map_err(|_| parse_err(file, line, format!("invalid port \"{p}\"")))
        })
        .collect()
}

fn parse_deps(field: &str, file: &str, line: usize) -> Result<Vec<ParsedDep>> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }
    field
        .split('#')
        .map(|entry| {
            let mut parts = entry.splitn(3, ';');
            let rule = parts
                .next()
                .ok_or_else(|| parse_err(file, line, "missing dependency rule index"))?
                .trim()
                .parse::<u32>()
                .map_err(|_| parse_err(file, line, "invalid dependency rule index"))?;
            let match_ = parts.next().unwrap_or("").trim().to_string();
            let ports = parse_port_list(parts.next().unwrap_or("[]"), file, line)?;
            Ok(ParsedDep { rule, match_, ports })
        })
        .collect()
}

/// Parse a `.tf` file's full contents. `file` is only used for error
/// messages.
pub fn parse_tf(contents: &str, file: &str) -> Result<ParsedTf> {
    let mut lines = contents.lines().enumerate();
    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_err(file, 0, "empty .tf file"))?;

    let mut fields = header.split('$');
    let two_l: usize = fields
        .next()
        .ok_or_else(|| parse_err(file, 1, "missing header length field"))?
        .trim()
        .parse()
        .map_err(|_| parse_err(file, 1, "header length field is not an integer"))?;
    let prefix = fields.next().unwrap_or("").trim().to_string();

    let mut rules = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let mut f = line.split('$');
        let kind = match f
            .next()
            .ok_or_else(|| parse_err(file, line_no, "missing rule type"))?
            .trim()
        {
            "fwd" => RuleKind::Fwd,
            "rw" => RuleKind::Rw,
            "link" => RuleKind::Link,
            other => {
                return Err(parse_err(
                    file,
                    line_no,
                    format!("unknown rule type \"{other}\""),
                ))
            }
        };
        let in_ports = parse_port_list(f.next().unwrap_or("[]"), file, line_no)?;
        let match_field = f.next().unwrap_or("").trim().to_string();
        let mask_field = f.next().unwrap_or("").trim().to_string();
        let rewrite_field = f.next().unwrap_or("").trim().to_string();
        let _inv_match = f.next();
        let _inv_rewrite = f.next();
        let out_ports = parse_port_list(f.next().unwrap_or("[]"), file, line_no)?;
        let deps = parse_deps(f.next().unwrap_or(""), file, line_no)?;

        let has_match = kind != RuleKind::Link && !match_field.is_empty();
        rules.push(ParsedRule {
            kind,
            in_ports,
            out_ports,
            match_: has_match.then_some(match_field),
            mask: (!mask_field.is_empty()).then_some(mask_field),
            rewrite: (!rewrite_field.is_empty()).then_some(rewrite_field),
            deps,
        });
    }

    Ok(ParsedTf {
        header_len: two_l / 2,
        prefix,
        rules,
    })
}

/// Parse a `stages` file: a single integer, the switch-local pipeline
/// depth.
pub fn parse_stages(contents: &str, file: &str) -> Result<usize> {
    contents
        .trim()
        .parse()
        .map_err(|_| parse_err(file, 1, format!("invalid stages value \"{}\"", contents.trim())))
}

fn to_port_ref(ports: &[u32], groups: &mut Vec<Vec<u32>>) -> PortRef {
    if ports.len() == 1 {
        PortRef::Exact(ports[0])
    } else {
        groups.push(ports.to_vec());
        PortRef::Group(groups.len() - 1)
    }
}

/// Convert a parsed text TF into the runtime [`Tf`], assigning rule
/// indices in file order (the same order priority/`deps_diff` relies on).
pub fn to_tf(parsed: &ParsedTf) -> Result<Tf> {
    let mut port_groups: Vec<Vec<u32>> = Vec::new();
    let mut rules = Vec::with_capacity(parsed.rules.len());

    for (idx, pr) in parsed.rules.iter().enumerate() {
        let in_port = to_port_ref(&pr.in_ports, &mut port_groups);
        let out_port = (!pr.out_ports.is_empty()).then(|| to_port_ref(&pr.out_ports, &mut port_groups));
        let match_ = pr.match_.as_deref().map(Cube::from_str).transpose()?;
        let mask = pr.mask.as_deref().map(Cube::from_str).transpose()?;
        let rewrite = pr.rewrite.as_deref().map(Cube::from_str).transpose()?;

        let mut deps = Vec::with_capacity(pr.deps.len());
        for d in &pr.deps {
            if d.rule as usize >= idx {
                return Err(HsaError::DependencyOrder {
                    rule: idx as u32,
                    dep_rule: d.rule,
                });
            }
            let port = (!d.ports.is_empty()).then(|| to_port_ref(&d.ports, &mut port_groups));
            deps.push(Dep {
                rule: d.rule,
                match_: Cube::from_str(&d.match_)?,
                port,
            });
        }

        rules.push(Rule {
            idx: idx as u32,
            in_port,
            out_port,
            match_,
            mask,
            rewrite,
            deps,
        });
    }

    Ok(Tf::new(
        (!parsed.prefix.is_empty()).then(|| parsed.prefix.clone()),
        rules,
        port_groups,
    ))
}
