//! Two-directional equivalence queries, the single-direction constant,
//! implication and clause variants, cone activity biasing, and the
//! counter-example capture path.
use {
    crate::{
        cnf::CnfIF,
        man::FraigMan,
        solver::SatSolverIF,
        state::Stat,
        types::*,
    },
};

pub trait ProveIF {
    /// Are two image nodes (uncomplemented, distinct) equal up to the
    /// complement their phase bits dictate?
    fn nodes_are_equiv(&mut self, old: NodeId, new: NodeId) -> ProofStatus;
    /// Is the image node the constant its phase bit dictates?
    fn node_is_const_sat(&mut self, new: NodeId) -> ProofStatus;
    /// Does `old ^ compl_l` imply `new ^ compl_r`?
    fn nodes_are_imp(&mut self, old: NodeId, new: NodeId, compl_l: bool, compl_r: bool)
        -> ProofStatus;
    /// Is the disjunction `(old ^ compl_l) | (new ^ compl_r)` a tautology?
    fn nodes_are_clause(&mut self, old: NodeId, new: NodeId, compl_l: bool, compl_r: bool)
        -> ProofStatus;
}

impl ProveIF for FraigMan {
    fn nodes_are_equiv(&mut self, old: NodeId, new: NodeId) -> ProofStatus {
        debug_assert_ne!(old, new);
        if self.global_budget_exceeded() {
            self.stats.saturated = true;
            return ProofStatus::Timeout;
        }
        // a failed node gets a shrunken budget, or none at all
        let mut bt = self.cfg.bt_limit_node;
        if !self.cfg.speculate
            && self.cfg.frames_ind == 0
            && bt > 0
            && (self.is_failed(old) || self.is_failed(new))
        {
            self.stats[Stat::SatFails] += 1;
            if bt <= 10 {
                return ProofStatus::Timeout;
            }
            bt = (bt as f64).powf(0.7) as u64;
        }
        self.stats[Stat::SatCalls] += 1;
        self.start_solver();
        self.cnf_add_to_solver(Some(old), Some(new));
        let ok = self.solver.as_mut().expect("no solver").simplify();
        debug_assert!(ok);
        if self.cfg.cone_bias {
            self.set_activity_factors(Some(old), Some(new));
        }
        let v_old = self.sat_var(old).expect("old without a variable");
        let v_new = self.sat_var(new).expect("new without a variable");
        let phase_eq = self.fraig.phase(old) == self.fraig.phase(new);

        // direction one: old = 1, new at the unexpected polarity
        let lits = [var_lit(v_old, false), var_lit(v_new, phase_eq)];
        match self.solve_dir(&lits, bt) {
            ProofStatus::Proved => {}
            refuted => return refuted,
        }
        // a constant representative needs only one direction
        if old == CONST1 {
            self.stats[Stat::SatProofs] += 1;
            return ProofStatus::Proved;
        }
        // direction two: old = 0
        let lits = [var_lit(v_old, true), var_lit(v_new, !phase_eq)];
        match self.solve_dir(&lits, bt) {
            ProofStatus::Proved => {}
            refuted => return refuted,
        }
        self.stats[Stat::SatProofs] += 1;
        ProofStatus::Proved
    }

    fn node_is_const_sat(&mut self, new: NodeId) -> ProofStatus {
        debug_assert_ne!(CONST1, new);
        if self.global_budget_exceeded() {
            self.stats.saturated = true;
            return ProofStatus::Timeout;
        }
        self.stats[Stat::SatCalls] += 1;
        self.start_solver();
        self.cnf_add_to_solver(None, Some(new));
        let ok = self.solver.as_mut().expect("no solver").simplify();
        debug_assert!(ok);
        if self.cfg.cone_bias {
            self.set_activity_factors(None, Some(new));
        }
        let v_new = self.sat_var(new).expect("new without a variable");
        let bt = self.cfg.bt_limit_miter;
        // a candidate constant evaluates to its phase everywhere; look for
        // the opposite value
        let lits = [var_lit(v_new, self.fraig.phase(new))];
        match self.solve_dir(&lits, bt) {
            ProofStatus::Proved => {
                self.stats[Stat::SatProofs] += 1;
                ProofStatus::Proved
            }
            other => other,
        }
    }

    fn nodes_are_imp(
        &mut self,
        old: NodeId,
        new: NodeId,
        compl_l: bool,
        compl_r: bool,
    ) -> ProofStatus {
        debug_assert_ne!(old, new);
        self.stats[Stat::SatCalls] += 1;
        self.start_solver();
        self.cnf_add_to_solver(Some(old), Some(new));
        let ok = self.solver.as_mut().expect("no solver").simplify();
        debug_assert!(ok);
        if self.cfg.cone_bias {
            self.set_activity_factors(Some(old), Some(new));
        }
        let v_old = self.sat_var(old).expect("old without a variable");
        let v_new = self.sat_var(new).expect("new without a variable");
        // antecedent true, consequent false
        let lits = [var_lit(v_old, compl_l), var_lit(v_new, !compl_r)];
        match self.solve_dir(&lits, self.cfg.bt_limit_node) {
            ProofStatus::Proved => {
                self.stats[Stat::SatProofs] += 1;
                ProofStatus::Proved
            }
            other => other,
        }
    }

    fn nodes_are_clause(
        &mut self,
        old: NodeId,
        new: NodeId,
        compl_l: bool,
        compl_r: bool,
    ) -> ProofStatus {
        debug_assert_ne!(old, new);
        self.stats[Stat::SatCalls] += 1;
        self.start_solver();
        self.cnf_add_to_solver(Some(old), Some(new));
        let ok = self.solver.as_mut().expect("no solver").simplify();
        debug_assert!(ok);
        if self.cfg.cone_bias {
            self.set_activity_factors(Some(old), Some(new));
        }
        let v_old = self.sat_var(old).expect("old without a variable");
        let v_new = self.sat_var(new).expect("new without a variable");
        // both disjuncts false at once
        let lits = [var_lit(v_old, !compl_l), var_lit(v_new, !compl_r)];
        match self.solve_dir(&lits, self.cfg.bt_limit_node) {
            ProofStatus::Proved => {
                self.stats[Stat::SatProofs] += 1;
                ProofStatus::Proved
            }
            other => other,
        }
    }
}

impl FraigMan {
    /// One assumption-based call. UNSAT installs the permanent blocking
    /// clause and reads as a proof of this direction; SAT captures the
    /// model into the pattern buffer; UNDEF marks the queried nodes
    /// failed.
    fn solve_dir(&mut self, assumptions: &[Lit], bt: u64) -> ProofStatus {
        let status = self
            .solver
            .as_mut()
            .expect("no solver")
            .solve(assumptions, bt, 0);
        match status {
            LFALSE => {
                let blocking: Vec<Lit> = assumptions.iter().map(|l| l.negate()).collect();
                let ok = self
                    .solver
                    .as_mut()
                    .expect("no solver")
                    .add_clause(&blocking);
                debug_assert!(ok);
                self.stats[Stat::SatCallsUnsat] += 1;
                ProofStatus::Proved
            }
            LTRUE => {
                self.save_pattern();
                self.stats[Stat::SatCallsSat] += 1;
                ProofStatus::Disproved
            }
            _ => {
                for l in assumptions {
                    let n = self.node_of_var(l.var());
                    if n != CONST1 {
                        self.set_failed(n);
                    }
                }
                self.stats[Stat::SatFailsReal] += 1;
                ProofStatus::Timeout
            }
        }
    }

    /// Reverse lookup used only on the failure path; queries carry at most
    /// two assumptions.
    fn node_of_var(&self, v: Var) -> NodeId {
        for n in 0..self.fraig.num_nodes() {
            if self.sat_var(n) == Some(v) {
                return n;
            }
        }
        CONST1
    }

    /// Walk the query cone down to `act_cone_ratio` of its depth and raise
    /// the decision priority of its variables, scaled by how close to the
    /// roots they sit.
    pub(crate) fn set_activity_factors(&mut self, old: Option<NodeId>, new: Option<NodeId>) {
        debug_assert!(old.is_some() || new.is_some());
        let ratio = self.cfg.act_cone_ratio;
        debug_assert!(0.0 < ratio && ratio < 1.0);
        let level_of = |n: Option<NodeId>| n.map_or(0, |n| self.fraig.level(n));
        let level_max = level_of(old).max(level_of(new));
        if level_max == 0 {
            return;
        }
        let level_min = (level_max as f64 * (1.0 - ratio)) as u32;
        let mut visited = vec![false; self.fraig.num_nodes()];
        let mut stack = Vec::new();
        for n in [old, new].iter().flatten() {
            if *n != CONST1 {
                stack.push(*n);
            }
        }
        while let Some(n) = stack.pop() {
            if visited[n] {
                continue;
            }
            visited[n] = true;
            let level = self.fraig.level(n);
            if level <= level_min || self.fraig.is_ci(n) {
                continue;
            }
            if let Some(v) = self.sat_var(n) {
                let bump = self.cfg.act_cone_bump_max * (level - level_min) as f64
                    / (level_max - level_min) as f64;
                self.solver
                    .as_mut()
                    .expect("no solver")
                    .bump_activity(v, bump);
            }
            if let Some(fanins) = self.cone_of(n) {
                for &f in fanins {
                    stack.push(f);
                }
            }
        }
    }
}
