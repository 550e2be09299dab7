//! Combinational equivalence checking: decide whether a miter's outputs
//! are all constant 0. A quick monolithic SAT attempt runs first; if it
//! times out, fraiging rounds with escalating conflict budgets shrink the
//! miter until its outputs fold to constants or the budgets run dry, with
//! one last monolithic attempt at the caller's full budget.
use {
    crate::{
        aig::Aig,
        cnf::CnfIF,
        config::Config,
        man::FraigMan,
        sim::Simulator,
        solver::SatSolverIF,
        sweep::{self, miter_status},
        types::*,
    },
    rand::{rngs::StdRng, SeedableRng},
};

/// budget of the opening monolithic SAT run
const BT_LIMIT_START: u64 = 300;
/// per-node budget of the first fraiging round
const BT_LIMIT_FIRST: u64 = 2;
/// fraiging rounds before the last-gasp SAT run
const CEC_ROUNDS: usize = 6;

/// The verdict on a miter plus the artifacts backing it.
#[derive(Debug)]
pub struct CecResult {
    pub status: MiterStatus,
    /// input assignment driving some output to 1, when available
    pub cex: Option<Vec<bool>>,
    /// the graph as it looked when the verdict fell
    pub aig: Aig,
}

/// Monolithic miter solve: clauseify every output cone, add the clause
/// asserting that some output is 1, and hand the whole problem to the
/// solver. On SAT the model over the inputs is returned.
pub fn fraig_sat(
    aig: &Aig,
    conf_budget: u64,
    prop_budget: u64,
) -> (ProofStatus, Option<Vec<bool>>) {
    debug_assert_eq!(0, aig.num_regs());
    let mut p = FraigMan::new(aig, &Config::default());
    p.fraig = aig.clone();
    p.start_solver();
    let mut or_lits = Vec::new();
    for i in 0..aig.num_cos() {
        let d = aig.co_driver(i);
        if d == EDGE_FALSE {
            continue;
        }
        if d == EDGE_TRUE {
            // a constant-true output; any assignment is a witness
            return (ProofStatus::Disproved, Some(vec![false; aig.num_cis()]));
        }
        p.cnf_add_to_solver(None, Some(d.nid()));
        let v = p.sat_var(d.nid()).expect("output without a variable");
        or_lits.push(var_lit(v, d.compl()));
    }
    if or_lits.is_empty() {
        return (ProofStatus::Proved, None);
    }
    {
        let solver = p.solver.as_mut().expect("no solver");
        if !solver.add_clause(&or_lits) || !solver.simplify() {
            return (ProofStatus::Proved, None);
        }
    }
    let status = p
        .solver
        .as_mut()
        .expect("no solver")
        .solve(&[], conf_budget, prop_budget);
    match status {
        LFALSE => (ProofStatus::Proved, None),
        LTRUE => {
            let solver = p.solver.as_ref().expect("no solver");
            let cex = (0..aig.num_cis())
                .map(|i| {
                    p.sat_var(aig.ci(i))
                        .map_or(false, |v| solver.var_value(v))
                })
                .collect();
            (ProofStatus::Disproved, Some(cex))
        }
        _ => (ProofStatus::Timeout, None),
    }
}

/// Iterated fraig-and-check on a combinational miter. `conf_limit` is the
/// budget of the final monolithic attempt.
pub fn fraig_cec(aig: &Aig, conf_limit: u64) -> CecResult {
    let cfg = Config::default();
    let mut cur = aig.clone();
    if miter_status(&cur) == MiterStatus::Proved {
        return CecResult {
            status: MiterStatus::Proved,
            cex: None,
            aig: cur,
        };
    }
    // random simulation refutes most shallow miters before any solving
    let mut sml = Simulator::new(&cur, 0, 1, cfg.sim_words);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    sml.simulate(&cur, &mut rng, false);
    if sml.nonconst_output_seen() {
        let cex = sml.output_counterexample(&cur);
        debug_assert!(cex.is_some());
        return CecResult {
            status: MiterStatus::Disproved,
            cex,
            aig: cur,
        };
    }
    // a cheap direct attempt often closes shallow miters outright
    let (status, cex) = fraig_sat(&cur, 2 * BT_LIMIT_START, 0);
    match status {
        ProofStatus::Proved => {
            return CecResult {
                status: MiterStatus::Proved,
                cex: None,
                aig: cur,
            }
        }
        ProofStatus::Disproved => {
            return CecResult {
                status: MiterStatus::Disproved,
                cex,
                aig: cur,
            }
        }
        ProofStatus::Timeout => {}
    }
    let mut node_budget = BT_LIMIT_FIRST;
    let mut miter_budget = BT_LIMIT_START;
    for round in 0..CEC_ROUNDS {
        let cfg = Config {
            bt_limit_node: node_budget,
            bt_limit_miter: miter_budget,
            ..Config::default()
        };
        let res = sweep::fraig_perform(&cur, &cfg);
        cur = res.aig;
        tracing::debug!(round, nodes = cur.num_ands(), "equivalence round done");
        match miter_status(&cur) {
            MiterStatus::Undecided => {}
            MiterStatus::Proved => {
                return CecResult {
                    status: MiterStatus::Proved,
                    cex: None,
                    aig: cur,
                }
            }
            MiterStatus::Disproved => {
                // an output folded to a satisfiable stub; pull a witness
                let (_, cex) = fraig_sat(&cur, conf_limit.max(BT_LIMIT_START), 0);
                return CecResult {
                    status: MiterStatus::Disproved,
                    cex,
                    aig: cur,
                };
            }
        }
        node_budget *= 8;
        miter_budget *= 2;
    }
    // last gasp at full strength
    let (status, cex) = fraig_sat(&cur, conf_limit, 0);
    let status = match status {
        ProofStatus::Proved => MiterStatus::Proved,
        ProofStatus::Disproved => MiterStatus::Disproved,
        ProofStatus::Timeout => MiterStatus::Undecided,
    };
    CecResult {
        status,
        cex,
        aig: cur,
    }
}
