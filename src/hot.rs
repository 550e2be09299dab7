//! One-hotness conditions over register pairs: two-literal clauses that
//! hold in every simulated reachable state ("these registers are never
//! both 1", and the implication-shaped variants). The surviving clauses
//! strengthen the inductive hypothesis on the first frame and are
//! themselves discharged at the last frame like the class candidates.
use {
    crate::{
        cnf::CnfIF,
        man::FraigMan,
        sat::ProveIF,
        sim::Simulator,
        solver::SatSolverIF,
        types::*,
    },
};

/// A register literal: register index plus a complement attribute.
pub type RegLit = (usize, bool);

/// A live two-literal clause over registers, or `None` once refuted.
pub type OneHot = Option<(RegLit, RegLit)>;

/// `true` iff the clause `(r1 ^ c1) | (r2 ^ c2)` holds on every simulated
/// pattern. Register blocks carry phase 0, so the stored words are the
/// raw values.
fn clause_holds(blk1: &[u32], blk2: &[u32], c1: bool, c2: bool) -> bool {
    debug_assert!(c1 || c2);
    let m1 = if c1 { 0 } else { !0u32 };
    let m2 = if c2 { 0 } else { !0u32 };
    blk1.iter()
        .zip(blk2.iter())
        .all(|(&w1, &w2)| (w1 ^ m1) & (w2 ^ m2) == 0)
}

/// Scan ordered register pairs of the simulated graph and keep every
/// two-literal clause that held throughout; pairs that are constant or
/// candidate-equivalent are left to the class machinery.
pub fn one_hot_compute(aig: &crate::aig::Aig, sml: &Simulator) -> Vec<OneHot> {
    use crate::classes::RefineIF;
    let mut out = Vec::new();
    let regs = aig.latch_outs();
    for i in 0..regs.len() {
        if sml.node_is_const(regs[i]) {
            continue;
        }
        for k in i + 1..regs.len() {
            if sml.node_is_const(regs[k]) || sml.nodes_are_equal(regs[i], regs[k]) {
                continue;
            }
            let b1 = sml.block(regs[i]);
            let b2 = sml.block(regs[k]);
            let pair = if clause_holds(b1, b2, true, true) {
                Some(((i, true), (k, true)))
            } else if clause_holds(b1, b2, false, true) {
                Some(((i, false), (k, true)))
            } else if clause_holds(b1, b2, true, false) {
                Some(((i, true), (k, false)))
            } else {
                None
            };
            if let Some(p) = pair {
                out.push(Some(p));
            }
        }
    }
    tracing::debug!(clauses = out.len(), "one-hotness conditions computed");
    out
}

/// Number of clauses still alive.
pub fn one_hot_count(hots: &[OneHot]) -> usize {
    hots.iter().filter(|h| h.is_some()).count()
}

impl FraigMan {
    /// Add the surviving clauses over the frame-0 register images of the
    /// unrolled graph; they join the speculation constraints as the
    /// hypothesis. `false` if the solver went inconsistent.
    pub(crate) fn one_hot_assume(&mut self) -> bool {
        let n = match &self.one_hots {
            None => return true,
            Some(h) => h.len(),
        };
        for idx in 0..n {
            let ((r1, c1), (r2, c2)) = match self.one_hots.as_ref().expect("checked")[idx] {
                None => continue,
                Some(p) => p,
            };
            let lo1 = self.aig.latch_outs()[r1];
            let lo2 = self.aig.latch_outs()[r2];
            let e1 = self.image(lo1, 0).expect("register image not built");
            let e2 = self.image(lo2, 0).expect("register image not built");
            self.cnf_add_to_solver(Some(e1.nid()), Some(e2.nid()));
            let v1 = self.sat_var(e1.nid()).expect("register without a variable");
            let v2 = self.sat_var(e2.nid()).expect("register without a variable");
            let lits = [
                var_lit(v1, c1 ^ e1.compl()),
                var_lit(v2, c2 ^ e2.compl()),
            ];
            let ok = self.solver.as_mut().expect("no solver").add_clause(&lits);
            if !ok {
                tracing::warn!("one-hotness clause contradicts the hypothesis");
                return false;
            }
        }
        true
    }

    /// Prove each surviving clause on the last-frame register images; a
    /// refuted clause replays its counter-example and dies, a timed-out
    /// one dies quietly.
    pub(crate) fn one_hot_check(&mut self, last_frame: usize) {
        let n = match &self.one_hots {
            None => return,
            Some(h) => h.len(),
        };
        for idx in 0..n {
            let ((r1, c1), (r2, c2)) = match self.one_hots.as_ref().expect("checked")[idx] {
                None => continue,
                Some(p) => p,
            };
            let lo1 = self.aig.latch_outs()[r1];
            let lo2 = self.aig.latch_outs()[r2];
            let e1 = self.image(lo1, last_frame).expect("register image not built");
            let e2 = self.image(lo2, last_frame).expect("register image not built");
            let (f1, f2) = (c1 ^ e1.compl(), c2 ^ e2.compl());
            if e1.nid() == CONST1 && e2.nid() == CONST1 {
                if f1 && f2 {
                    self.kill_hot(idx);
                }
                continue;
            }
            if e1.nid() == e2.nid() {
                // structural: a tautology iff the polarities differ
                if f1 == f2 {
                    self.kill_hot(idx);
                }
                continue;
            }
            if e1.nid() == CONST1 || e2.nid() == CONST1 {
                // one side is a constant literal: either the clause is
                // satisfied outright or it collapses to the other literal,
                // which the class machinery owns
                let const_true = if e1.nid() == CONST1 { !f1 } else { !f2 };
                if !const_true {
                    self.kill_hot(idx);
                }
                continue;
            }
            match self.nodes_are_clause(e1.nid(), e2.nid(), f1, f2) {
                ProofStatus::Proved => {}
                ProofStatus::Disproved => {
                    self.kill_hot(idx);
                    self.resimulate();
                }
                ProofStatus::Timeout => self.kill_hot(idx),
            }
        }
    }

    fn kill_hot(&mut self, idx: usize) {
        if let Some(h) = &mut self.one_hots {
            h[idx] = None;
        }
    }

    /// Drop every clause the current simulation state violates; part of
    /// counter-example replay. Returns the number of clauses dropped.
    pub(crate) fn one_hot_refine(&mut self) -> usize {
        let FraigMan {
            ref mut one_hots,
            ref sml,
            ref aig,
            ..
        } = *self;
        let hots = match one_hots {
            None => return 0,
            Some(h) => h,
        };
        let mut dropped = 0;
        for slot in hots.iter_mut() {
            let ((r1, c1), (r2, c2)) = match *slot {
                None => continue,
                Some(p) => p,
            };
            let b1 = sml.block(aig.latch_outs()[r1]);
            let b2 = sml.block(aig.latch_outs()[r2]);
            if !clause_holds(b1, b2, c1, c2) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::aig::Aig,
        rand::{rngs::StdRng, SeedableRng},
    };

    #[test]
    fn clause_shapes_match_simulation() {
        // r1 = 0011, r2 = 0111 as single-word blocks: r1 implies r2
        let b1 = [0b0011u32];
        let b2 = [0b0111u32];
        assert!(clause_holds(&b1, &b2, true, false)); // !r1 | r2
        assert!(!clause_holds(&b1, &b2, true, true)); // both 1 in bits 0..2
        assert!(!clause_holds(&b1, &b2, false, true)); // r2 without r1 at bit 2
    }

    /// A pair of registers that can never be 1 together: the enable picks
    /// at most one of them each cycle.
    #[test]
    fn compute_finds_exclusive_registers() {
        let mut aig = Aig::new();
        let pi = aig.add_ci().edge(false);
        let r0 = aig.add_ci().edge(false);
        let r1 = aig.add_ci().edge(false);
        let n0 = aig.and(pi, r1.flip()); // r0' = pi & !r1
        let n1 = aig.and(pi.flip(), r0); // r1' = !pi & r0
        aig.add_co(r0); // observe something
        aig.add_co(n0);
        aig.add_co(n1);
        aig.set_num_regs(2);
        let mut sml = Simulator::new(&aig, 0, 16, 2);
        let mut rng = StdRng::seed_from_u64(7);
        sml.simulate(&aig, &mut rng, true);
        let hots = one_hot_compute(&aig, &sml);
        assert_eq!(1, one_hot_count(&hots));
        let ((a, ca), (b, cb)) = hots[0].expect("pair alive");
        assert_eq!((0, true), (a, ca));
        assert_eq!((1, true), (b, cb));
    }
}
