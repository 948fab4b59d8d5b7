//! Header-space set algebra: a header space is a union of ternary cubes,
//! each carrying a lazily-applied "diff list" of cubes subtracted from it.
//! Keeping diffs lazy avoids eagerly expanding every subtraction into its
//! DNF complement, which is what makes repeated `minus`/`isect` affordable.

use crate::array::{combine, CombineOutcome, Cube};
use crate::error::Result;

/// One union member: a cube, plus the cubes subtracted from it that have
/// not yet been folded in via [`HeaderSpace::compact`]/[`HeaderSpace::comp_diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsElem {
    pub cube: Cube,
    pub diff: Vec<Cube>,
}

/// A header space: `union(elems[i].cube) - union(elems[i].diff)` per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpace {
    len: usize,
    elems: Vec<HsElem>,
}

impl HeaderSpace {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            elems: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn elems(&self) -> &[HsElem] {
        &self.elems
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn count(&self) -> usize {
        self.elems.len()
    }

    pub fn count_diff(&self) -> usize {
        self.elems.iter().map(|e| e.diff.len()).sum()
    }

    /// Add a cube to the union, with an empty diff list.
    pub fn add(&mut self, cube: Cube) {
        self.elems.push(HsElem {
            cube,
            diff: Vec::new(),
        });
    }

    /// Subtract `a` from every element, lazily (appends to each element's
    /// diff list instead of expanding immediately).
    pub fn diff(&mut self, a: &Cube) -> Result<()> {
        for elem in &mut self.elems {
            if let Some(tmp) = elem.cube.isect(a)? {
                elem.diff.push(tmp);
            }
        }
        Ok(())
    }

    /// Fold every element's diff list into it directly, producing a flat
    /// union of concrete cubes. Each resulting element may still carry a
    /// (generally much smaller) diff list contributed by the internal
    /// intersect-with-complement step.
    pub fn comp_diff(&mut self) -> Result<()> {
        let mut new_list = Vec::new();
        for elem in std::mem::take(&mut self.elems) {
            let mut tmp = HeaderSpace {
                len: self.len,
                elems: vec![HsElem {
                    cube: elem.cube,
                    diff: Vec::new(),
                }],
            };
            let tmp2 = HeaderSpace {
                len: self.len,
                elems: elem
                    .diff
                    .into_iter()
                    .map(|cube| HsElem {
                        cube,
                        diff: Vec::new(),
                    })
                    .collect(),
            };
            tmp.minus(&tmp2)?;
            new_list.extend(tmp.elems);
        }
        self.elems = new_list;
        Ok(())
    }

    /// Complement in place: `self = universe - self`.
    pub fn cmpl(&mut self) -> Result<()> {
        if self.elems.is_empty() {
            self.elems.push(HsElem {
                cube: Cube::new(self.len, crate::array::BitVal::X),
                diff: Vec::new(),
            });
            return Ok(());
        }

        let mut new_list: Option<HeaderSpace> = None;
        for elem in std::mem::take(&mut self.elems) {
            let pieces = elem.cube.cmpl();
            if pieces.is_empty() {
                // elem.cube was the all-x cube: its complement is empty,
                // so the union complement collapses to empty.
                self.elems.clear();
                return Ok(());
            }
            let mut tmp_elems: Vec<HsElem> = pieces
                .into_iter()
                .map(|cube| HsElem {
                    cube,
                    diff: Vec::new(),
                })
                .collect();
            for d in elem.diff {
                tmp_elems.push(HsElem {
                    cube: d,
                    diff: Vec::new(),
                });
            }
            let tmp = HeaderSpace {
                len: self.len,
                elems: tmp_elems,
            };
            new_list = Some(match new_list {
                None => tmp,
                Some(nl) => nl.isect_a(&tmp)?,
            });
        }
        self.elems = new_list.map(|h| h.elems).unwrap_or_default();
        Ok(())
    }

    /// Pairwise intersection of two header spaces, combining each pair's
    /// diff lists by re-intersecting them against the new element.
    pub fn isect_a(&self, other: &HeaderSpace) -> Result<HeaderSpace> {
        let mut new_elems = Vec::new();
        for a in &self.elems {
            for b in &other.elems {
                let Some(isect) = a.cube.isect(&b.cube)? else {
                    continue;
                };
                let mut diff = Vec::new();
                for d in &a.diff {
                    if let Some(t) = isect.isect(d)? {
                        diff.push(t);
                    }
                }
                for d in &b.diff {
                    if let Some(t) = isect.isect(d)? {
                        diff.push(t);
                    }
                }
                new_elems.push(HsElem { cube: isect, diff });
            }
        }
        Ok(HeaderSpace {
            len: self.len,
            elems: new_elems,
        })
    }

    pub fn isect(&mut self, other: &HeaderSpace) -> Result<()> {
        self.elems = self.isect_a(other)?.elems;
        Ok(())
    }

    /// Intersect with a single cube, returning `None` when the result would
    /// be empty. On success, starts from the first element that actually
    /// intersects `a`, matching the original's short-circuit search.
    pub fn isect_arr(&self, a: &Cube) -> Result<Option<HeaderSpace>> {
        let Some(pos) = self
            .elems
            .iter()
            .position(|e| e.cube.isect(a).ok().flatten().is_some())
        else {
            return Ok(None);
        };
        let mut out = Vec::new();
        for elem in &self.elems[pos..] {
            let Some(isect) = elem.cube.isect(a)? else {
                continue;
            };
            let mut diff = Vec::new();
            for d in &elem.diff {
                if let Some(t) = d.isect(a)? {
                    diff.push(t);
                }
            }
            out.push(HsElem { cube: isect, diff });
        }
        Ok(Some(HeaderSpace {
            len: self.len,
            elems: out,
        }))
    }

    /// Remove `other` from `self`, then compact.
    pub fn minus(&mut self, other: &HeaderSpace) -> Result<()> {
        let mut tmp = other.clone();
        tmp.cmpl()?;
        self.isect(&tmp)?;
        self.compact_m(None);
        Ok(())
    }

    /// Rewrite every cube (and each surviving diff cube) in place. A diff
    /// cube that rewrites to a different x-count than its parent no longer
    /// corresponds to a real subtraction (the rewrite merged it into the
    /// parent's concrete bits) and is dropped.
    pub fn rewrite(&mut self, mask: &Cube, rewrite: &Cube) -> Result<()> {
        for elem in &mut self.elems {
            let n = elem.cube.rewrite(mask, rewrite)?;
            let mut kept = Vec::with_capacity(elem.diff.len());
            for mut d in std::mem::take(&mut elem.diff) {
                let m = d.rewrite(mask, rewrite)?;
                if n == m {
                    kept.push(d);
                }
            }
            elem.diff = kept;
        }
        Ok(())
    }

    /// Rewrite `diff` per `mask`/`rewrite` and, if the rewrite preserves
    /// `diff`'s x-count relative to the matching element of `self`
    /// (i.e. the subtraction still applies after rewriting), append it to
    /// the corresponding element of `rw_hs`. `self` and `rw_hs` must have
    /// the same element count and order (typically `rw_hs` was copied from
    /// `self` before being rewritten). Returns whether anything changed.
    pub fn postponed_diff_and_rewrite(
        &self,
        rw_hs: &mut HeaderSpace,
        diff: &Cube,
        mask: &Cube,
        rewrite: &Cube,
    ) -> Result<bool> {
        let mut changed = false;
        for (i, elem) in self.elems.iter().enumerate() {
            let Some(mut tmp) = elem.cube.isect(diff)? else {
                continue;
            };
            let n = elem.cube.x_count(mask)?;
            let m = tmp.rewrite(mask, rewrite)?;
            if n == m {
                changed = true;
                rw_hs.elems[i].diff.push(tmp);
            }
        }
        Ok(changed)
    }

    pub fn compact(&mut self) -> bool {
        self.compact_m(None)
    }

    /// Simplify each element's diff list (merging/dropping redundant diff
    /// cubes via [`combine`]) and drop elements whose diff list now fully
    /// covers them. Returns whether any elements remain.
    pub fn compact_m(&mut self, mask: Option<&Cube>) -> bool {
        let mut i = 0;
        while i < self.elems.len() {
            vec_compact(&mut self.elems[i].diff, mask);
            if self.elems[i]
                .diff
                .iter()
                .any(|d| d.is_superset_of(&self.elems[i].cube))
            {
                self.elems.remove(i);
                continue;
            }
            i += 1;
        }
        !self.elems.is_empty()
    }

    /// Render as `elem1 + (elem2 - (d1 + d2)) + ...`.
    pub fn to_str(&self) -> String {
        let mut parts = Vec::with_capacity(self.elems.len());
        for elem in &self.elems {
            if elem.diff.is_empty() {
                parts.push(elem.cube.to_str(true));
            } else {
                let diffs: Vec<String> = elem.diff.iter().map(|d| d.to_str(true)).collect();
                parts.push(format!("({} - ({}))", elem.cube.to_str(true), diffs.join(" + ")));
            }
        }
        format!("({})", parts.join(" + "))
    }
}

/// Merge/drop redundant cubes within a single diff list in place, mirroring
/// the original's swap-with-last removal and in-loop append of merge
/// leftovers.
fn vec_compact(v: &mut Vec<Cube>, mask: Option<&Cube>) {
    let mut i = 0;
    while i < v.len() {
        let mut j = i + 1;
        let mut i_removed = false;
        while j < v.len() {
            match combine(&v[i], &v[j], mask) {
                CombineOutcome::NoMerge => {
                    j += 1;
                }
                CombineOutcome::DropB => {
                    v.swap_remove(j);
                }
                CombineOutcome::DropA => {
                    v.swap_remove(i);
                    i_removed = true;
                    break;
                }
                CombineOutcome::ReplaceBoth(merged) => {
                    v.swap_remove(j);
                    v[i] = merged;
                    i_removed = true;
                    break;
                }
                CombineOutcome::ReplaceA(merged) => {
                    v[i] = merged;
                    j += 1;
                }
                CombineOutcome::ReplaceB(merged) => {
                    v[j] = merged;
                    j += 1;
                }
                CombineOutcome::AddExtra(extra) => {
                    v.push(extra);
                    j += 1;
                }
            }
        }
        if !i_removed {
            i += 1;
        }
    }
}
