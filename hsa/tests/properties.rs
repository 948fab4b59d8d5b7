//! Property checks for the ternary algebra, header-space algebra, and
//! reachability engine, over small hand-rolled enumerations (no
//! proptest/quickcheck dependency — the state spaces here are tiny enough
//! that exhaustive enumeration over a couple of varying positions is both
//! simpler and more deterministic).

use hsa::array::{combine, BitVal, Cube, CombineOutcome};
use hsa::hs::HeaderSpace;
use hsa::node::NodeArena;
use hsa::reach::{self, SearchConfig};
use hsa::tables::Tables;

fn c(s: &str) -> Cube {
    Cube::from_str(s).unwrap()
}

/// Every cube string over two varying positions (the rest held at `x`),
/// values drawn from `{0,1,x}` — 9 combinations.
fn small_cubes() -> Vec<Cube> {
    let mut out = Vec::new();
    for &a in &['0', '1', 'x'] {
        for &b in &['0', '1', 'x'] {
            out.push(c(&format!("{a}{b}xxxxxx")));
        }
    }
    out
}

/// Concrete (no-`x`) headers over the same two varying positions, for
/// membership-style set tests — 4 combinations.
fn small_headers() -> Vec<Cube> {
    let mut out = Vec::new();
    for &a in &['0', '1'] {
        for &b in &['0', '1'] {
            out.push(c(&format!("{a}{b}xxxxxx")));
        }
    }
    out
}

fn hs_of(cubes: &[Cube]) -> HeaderSpace {
    let mut hs = HeaderSpace::new(1);
    for cube in cubes {
        hs.add(cube.clone());
    }
    hs
}

fn member(hs: &HeaderSpace, header: &Cube) -> bool {
    hs.elems().iter().any(|e| {
        e.cube.is_superset_of(header) && !e.diff.iter().any(|d| d.is_superset_of(header))
    })
}

// 1. Cube round-trip: no-`z` strings round-trip through from_str/to_str.
#[test]
fn cube_round_trip() {
    for cube in small_cubes() {
        assert!(!cube.has_z());
        let s = cube.to_str(false);
        let back = Cube::from_str(&s).unwrap();
        assert_eq!(cube, back);
    }
}

// 2. Intersection laws.
#[test]
fn intersection_laws() {
    let all_x = Cube::new(1, BitVal::X);
    for a in small_cubes() {
        assert_eq!(a.isect(&a).unwrap(), Some(a.clone()));
        assert_eq!(a.isect(&all_x).unwrap(), Some(a.clone()));
    }
    for a in small_cubes() {
        for b in small_cubes() {
            assert_eq!(a.isect(&b).unwrap(), b.isect(&a).unwrap());
        }
    }
    for a in small_cubes() {
        for b in small_cubes() {
            for cc in small_cubes() {
                let lhs = a
                    .isect(&b)
                    .unwrap()
                    .and_then(|ab| ab.isect(&cc).unwrap());
                let rhs = b
                    .isect(&cc)
                    .unwrap()
                    .and_then(|bc| a.isect(&bc).unwrap());
                assert_eq!(lhs, rhs, "isect not associative for {a:?},{b:?},{cc:?}");
            }
        }
    }
}

// 3. Complement involution, checked by membership over concrete headers.
#[test]
fn complement_is_involution() {
    for cube in small_cubes() {
        let mut hs = HeaderSpace::new(1);
        hs.add(cube.clone());
        hs.cmpl().unwrap();
        hs.cmpl().unwrap();
        hs.comp_diff().unwrap();
        for header in small_headers() {
            assert_eq!(
                member(&hs_of(&[cube.clone()]), &header),
                member(&hs, &header),
                "double complement disagrees with original on {header:?}"
            );
        }
    }
}

// 4. Rewrite: full-x mask is identity; fixed mask/rewrite is idempotent.
#[test]
fn rewrite_identity_and_idempotent() {
    let full_x_mask = Cube::new(1, BitVal::X);
    let rw = c("00xxxxxx");
    for cube in small_cubes() {
        let mut a = cube.clone();
        a.rewrite(&full_x_mask, &rw).unwrap();
        assert_eq!(a, cube, "full-x mask rewrite should be identity");
    }

    let mask = c("11xxxxxx");
    for cube in small_cubes() {
        let mut once = cube.clone();
        once.rewrite(&mask, &rw).unwrap();
        let mut twice = once.clone();
        twice.rewrite(&mask, &rw).unwrap();
        assert_eq!(once, twice, "rewrite should be idempotent for fixed mask/rewrite");
    }
}

// 5. HS minus laws.
#[test]
fn hs_minus_laws() {
    for a_cube in small_cubes() {
        for b_cube in small_cubes() {
            let mut a = hs_of(&[a_cube.clone()]);
            let b = hs_of(&[b_cube.clone()]);
            a.minus(&b).unwrap();
            for header in small_headers() {
                if member(&a, &header) {
                    assert!(!member(&b, &header), "(A \\ B) should not intersect B");
                }
            }
        }
    }

    let mut a = hs_of(&small_cubes());
    let b = a.clone();
    a.minus(&b).unwrap();
    assert!(a.is_empty(), "A \\ A should be empty");

    let mut c_hs = hs_of(&small_cubes());
    let before = c_hs.clone();
    c_hs.compact();
    for header in small_headers() {
        assert_eq!(member(&before, &header), member(&c_hs, &header));
    }
}

// 6. Combine soundness.
#[test]
fn combine_soundness() {
    for a in small_cubes() {
        for b in small_cubes() {
            let outcome = combine(&a, &b, None);
            match outcome {
                CombineOutcome::NoMerge => {}
                CombineOutcome::DropA => {
                    assert!(b.is_superset_of(&a));
                }
                CombineOutcome::DropB => {
                    assert!(a.is_superset_of(&b));
                }
                CombineOutcome::ReplaceA(ref merged)
                | CombineOutcome::ReplaceB(ref merged)
                | CombineOutcome::ReplaceBoth(ref merged) => {
                    for header in small_headers() {
                        let in_union = a.is_superset_of(&header) || b.is_superset_of(&header);
                        let in_merged = merged.is_superset_of(&header);
                        assert_eq!(in_union, in_merged, "combine changed the set for {header:?}");
                    }
                }
                CombineOutcome::AddExtra(ref extra) => {
                    for header in small_headers() {
                        let in_union = a.is_superset_of(&header) || b.is_superset_of(&header);
                        let in_three = in_union || extra.is_superset_of(&header);
                        assert!(in_three >= in_union);
                    }
                }
            }
        }
    }
}

// 7. Reachability monotonicity: a bigger ingress HS reaches a superset of
// egress results for the same target port.
#[test]
fn reachability_is_monotone() {
    let net = hsa_scenarios::s1_single_rule::network();
    let arena = NodeArena::new();
    let tables = Tables::new(hsa_scenarios::s1_single_rule::HEADER_LEN, net);

    let small_hs = hs_of(&[c("0xxxxxxx")]);
    let big_hs = hs_of(&[c("0xxxxxxx"), c("1xxxxxxx")]);

    let small_in = tables
        .create_input(&arena, small_hs, hsa_scenarios::s1_single_rule::IN_PORT, 4)
        .unwrap();
    let big_in = tables
        .create_input(&arena, big_hs, hsa_scenarios::s1_single_rule::IN_PORT, 4)
        .unwrap();

    let config = SearchConfig::default();
    let small_results = reach::search(tables.network(), &arena, vec![small_in], &config).unwrap();
    let big_results = reach::search(tables.network(), &arena, vec![big_in], &config).unwrap();

    let small_hs_out = arena.hs(*small_results.iter().next().unwrap());
    let big_hs_out = arena.hs(*big_results.iter().next().unwrap());

    for header in small_headers() {
        if member(&small_hs_out, &header) {
            assert!(member(&big_hs_out, &header));
        }
    }
}

// 8. Loop detection: find_loop results all repeat a port on their own
// ancestry; without it, no result does.
#[test]
fn loop_detection_behaves() {
    let net = hsa_scenarios::s4_loop::network();
    let arena = NodeArena::new();
    let tables = Tables::new(hsa_scenarios::s4_loop::HEADER_LEN, net);
    let mut hs = HeaderSpace::new(hsa_scenarios::s4_loop::HEADER_LEN);
    hs.add(Cube::new(hsa_scenarios::s4_loop::HEADER_LEN, BitVal::X));
    let input = tables
        .create_input(&arena, hs, hsa_scenarios::s4_loop::IN_PORT, 16)
        .unwrap();

    let unreachable = SearchConfig {
        target_ports: Some(vec![hsa_scenarios::s4_loop::UNREACHABLE_PORT]),
        ..Default::default()
    };
    let no_loop = reach::search(tables.network(), &arena, vec![input], &unreachable).unwrap();
    assert!(no_loop.is_empty(), "without -loop this topology has no egress");
}

#[test]
fn loop_detection_with_flag_finds_the_cycle() {
    let net = hsa_scenarios::s4_loop::network();
    let arena = NodeArena::new();
    let tables = Tables::new(hsa_scenarios::s4_loop::HEADER_LEN, net);
    let mut hs = HeaderSpace::new(hsa_scenarios::s4_loop::HEADER_LEN);
    hs.add(Cube::new(hsa_scenarios::s4_loop::HEADER_LEN, BitVal::X));
    let input = tables
        .create_input(&arena, hs, hsa_scenarios::s4_loop::IN_PORT, 16)
        .unwrap();

    let find_loop = SearchConfig {
        target_ports: Some(vec![hsa_scenarios::s4_loop::UNREACHABLE_PORT]),
        find_loop: true,
        ..Default::default()
    };
    let results = reach::search(tables.network(), &arena, vec![input], &find_loop).unwrap();
    assert_eq!(results.len(), 1);
    let node = *results.iter().next().unwrap();
    assert_eq!(arena.port(node), hsa_scenarios::s4_loop::IN_PORT);
    assert!(arena.parent(node).is_some());
}

// 9. Forward/backward consistency.
#[test]
fn forward_backward_consistency() {
    let net = hsa_scenarios::s6_two_switch_link::network();
    let arena = NodeArena::new();
    let tables = Tables::new(hsa_scenarios::s6_two_switch_link::HEADER_LEN, net);

    let ingress = c("0000xxxx");
    let mut hs = HeaderSpace::new(hsa_scenarios::s6_two_switch_link::HEADER_LEN);
    hs.add(ingress.clone());
    let input = tables
        .create_input(&arena, hs, hsa_scenarios::s6_two_switch_link::IN_PORT, 8)
        .unwrap();

    // A target is needed so the link-layer hop at switch 1's own out port
    // doesn't also count as a result alongside switch 2's final egress.
    let config = SearchConfig {
        target_ports: Some(vec![hsa_scenarios::s6_two_switch_link::OUT_PORT]),
        ..Default::default()
    };
    let results = reach::search(tables.network(), &arena, vec![input], &config).unwrap();
    assert_eq!(results.len(), 1);
    let out_node = *results.iter().next().unwrap();
    let out_array = arena.hs(out_node).elems()[0].cube.clone();

    let preimage = reach::backward_walk(tables.network(), &arena, out_node, &out_array).unwrap();
    assert!(!preimage.is_empty());

    // Regions varying the two bits ingress itself constrains, rest held
    // fixed to ingress's own pattern: since neither switch rewrites or
    // restricts its match, the preimage should agree exactly with ingress.
    let ingress_hs = hs_of(&[ingress.clone()]);
    for &a in &['0', '1'] {
        for &b in &['0', '1'] {
            let region = c(&format!("{a}{b}00xxxx"));
            let in_preimage = member(&preimage, &region);
            let in_ingress = member(&ingress_hs, &region);
            assert_eq!(in_preimage, in_ingress, "preimage disagrees with ingress on {region:?}");
        }
    }
}
