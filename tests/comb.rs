//! Combinational sweeping scenarios: constant propagation, the De Morgan
//! pair, a miter of two structurally different adders, and budget
//! resilience on a hard sub-problem.
use fraig::{
    fraig_perform, miter_status,
    state::Stat,
    types::*,
    Aig, Config, MiterStatus,
};

fn ci(aig: &mut Aig) -> Edge {
    aig.add_ci().edge(false)
}

/// xor through the or-of-ands expansion
fn xor_a(aig: &mut Aig, x: Edge, y: Edge) -> Edge {
    let p = aig.and(x, y.flip());
    let q = aig.and(x.flip(), y);
    aig.or(p, q)
}

/// xor as (x | y) & !(x & y)
fn xor_b(aig: &mut Aig, x: Edge, y: Edge) -> Edge {
    let o = aig.or(x, y);
    let a = aig.and(x, y);
    aig.and(o, a.flip())
}

#[test]
fn constant_propagation() {
    let mut aig = Aig::new();
    let x = ci(&mut aig);
    let n = aig.and(x, x.flip());
    aig.add_co(n);
    let res = fraig_perform(&aig, &Config::default());
    assert_eq!(0, res.aig.num_ands());
    assert_eq!(EDGE_FALSE, res.aig.co_driver(0));
}

#[test]
fn constant_propagation_through_hidden_cone() {
    // f = (x & y) & (x & !y) is zero but survives structural hashing
    let mut aig = Aig::new();
    let x = ci(&mut aig);
    let y = ci(&mut aig);
    let a = aig.and(x, y);
    let b = aig.and(x, y.flip());
    let f = aig.and(a, b);
    aig.add_co(f);
    let res = fraig_perform(&aig, &Config::default());
    assert_eq!(0, res.aig.num_ands());
    assert_eq!(MiterStatus::Proved, miter_status(&res.aig));
}

#[test]
fn de_morgan_miter() {
    let mut aig = Aig::new();
    let a = ci(&mut aig);
    let b = ci(&mut aig);
    let n1 = aig.and(a, b).flip();
    // !a | !b expanded into a structurally different cone
    let x = xor_a(&mut aig, a, b);
    let z = aig.and(a.flip(), b.flip());
    let n2 = aig.or(x, z);
    aig.add_co(n1);
    aig.add_co(n2);
    let res = fraig_perform(&aig, &Config::default());
    assert_eq!(res.aig.co_driver(0), res.aig.co_driver(1));
    assert_eq!(1, res.aig.num_ands());
    for bits in 0..4usize {
        let cis = vec![bits & 1 != 0, bits & 2 != 0];
        assert_eq!(aig.eval_comb(&cis), res.aig.eval_comb(&cis));
    }
}

/// One-bit full adder over (x, y, carry-in); returns (sum, carry-out).
fn full_adder(
    aig: &mut Aig,
    x: Edge,
    y: Edge,
    cin: Edge,
    xor: fn(&mut Aig, Edge, Edge) -> Edge,
) -> (Edge, Edge) {
    let t = xor(aig, x, y);
    let s = xor(aig, t, cin);
    let c1 = aig.and(x, y);
    let c2 = aig.and(t, cin);
    let cout = aig.or(c1, c2);
    (s, cout)
}

#[test]
fn adder_miter_proves_constant() {
    let mut aig = Aig::new();
    let a0 = ci(&mut aig);
    let a1 = ci(&mut aig);
    let b0 = ci(&mut aig);
    let b1 = ci(&mut aig);
    let (s0, c0) = full_adder(&mut aig, a0, b0, EDGE_FALSE, xor_a);
    let (s1, c1) = full_adder(&mut aig, a1, b1, c0, xor_a);
    let (t0, d0) = full_adder(&mut aig, a0, b0, EDGE_FALSE, xor_b);
    let (t1, d1) = full_adder(&mut aig, a1, b1, d0, xor_b);
    let m0 = aig.exor(s0, t0);
    let m1 = aig.exor(s1, t1);
    let m2 = aig.exor(c1, d1);
    let m01 = aig.or(m0, m1);
    let miter = aig.or(m01, m2);
    aig.add_co(miter);
    let res = fraig_perform(&aig, &Config::default());
    assert_eq!(EDGE_FALSE, res.aig.co_driver(0));
    assert_eq!(MiterStatus::Proved, miter_status(&res.aig));
}

/// Pigeonhole formula as a circuit: `n` pigeons into `n - 1` holes, one
/// variable per (pigeon, hole) pair.
fn pigeonhole(aig: &mut Aig, pigeons: usize) -> Edge {
    let holes = pigeons - 1;
    let mut vars: Vec<Vec<Edge>> = Vec::new();
    for _ in 0..pigeons {
        let mut row = Vec::new();
        for _ in 0..holes {
            row.push(ci(aig));
        }
        vars.push(row);
    }
    let mut formula = EDGE_TRUE;
    for p in 0..pigeons {
        let mut placed = EDGE_FALSE;
        for h in 0..holes {
            placed = aig.or(placed, vars[p][h]);
        }
        formula = aig.and(formula, placed);
    }
    for h in 0..holes {
        for p1 in 0..pigeons {
            for p2 in p1 + 1..pigeons {
                let both = aig.and(vars[p1][h], vars[p2][h]);
                formula = aig.and(formula, both.flip());
            }
        }
    }
    formula
}

#[test]
fn timeout_leaves_easy_equivalences_proved() {
    let mut aig = Aig::new();
    // the easy part: a De Morgan pair on fresh inputs
    let a = ci(&mut aig);
    let b = ci(&mut aig);
    let easy1 = aig.and(a, b).flip();
    let x = xor_a(&mut aig, a, b);
    let z = aig.and(a.flip(), b.flip());
    let easy2 = aig.or(x, z);
    // the hard part: an unsatisfiable pigeonhole cone over ~200 inputs
    let php = pigeonhole(&mut aig, 15);
    aig.add_co(easy1);
    aig.add_co(easy2);
    aig.add_co(php);
    let cfg = Config {
        bt_limit_node: 50,
        bt_limit_miter: 50,
        ..Config::default()
    };
    let res = fraig_perform(&aig, &cfg);
    // the pigeonhole output could not be closed within the budget
    assert_eq!(MiterStatus::Undecided, miter_status(&res.aig));
    assert!(res.stats[Stat::SatFailsReal] > 0);
    // but the easy pair still merged
    assert_eq!(res.aig.co_driver(0), res.aig.co_driver(1));
}
