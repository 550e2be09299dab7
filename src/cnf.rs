//! Lazy clauseification: exactly the cone a query needs, never more.
//!
//! Variables are handed out on first contact; each image node is encoded
//! once per solver lifetime, as either a recognized MUX (six clauses) or a
//! multi-input supergate AND (n implications plus one conjunction clause).
use {
    crate::{
        man::FraigMan,
        solver::SatSolverIF,
        types::*,
    },
};

const USE_MUXES: bool = true;

pub trait CnfIF {
    /// Ensure both nodes (image-graph ids, uncomplemented) have SAT
    /// variables and defining clauses in the solver.
    fn cnf_add_to_solver(&mut self, old: Option<NodeId>, new: Option<NodeId>);
}

impl CnfIF for FraigMan {
    fn cnf_add_to_solver(&mut self, old: Option<NodeId>, new: Option<NodeId>) {
        debug_assert!(old.is_some() || new.is_some());
        let ready = |p: &FraigMan, n: Option<NodeId>| match n {
            None => true,
            Some(n) => n == CONST1 || !p.fraig.is_and(n) || p.cone_of(n).is_some(),
        };
        if ready(self, old) && ready(self, new) && old.map_or(true, |n| self.sat_var(n).is_some())
            && new.map_or(true, |n| self.sat_var(n).is_some())
        {
            return;
        }
        let mut frontier = Vec::with_capacity(64);
        if let Some(n) = old {
            self.add_to_frontier(n, &mut frontier);
        }
        if let Some(n) = new {
            self.add_to_frontier(n, &mut frontier);
        }
        let mut i = 0;
        while i < frontier.len() {
            let node = frontier[i];
            i += 1;
            debug_assert!(self.sat_var(node).is_some());
            debug_assert!(self.cone_of(node).is_none());
            if USE_MUXES && self.fraig.is_mux_type(node) {
                let (ci, ct, ce) = self.fraig.recognize_mux(node);
                let mut fanins = vec![ci.nid()];
                for &e in &[ct, ce] {
                    if !fanins.contains(&e.nid()) {
                        fanins.push(e.nid());
                    }
                }
                for &f in &fanins {
                    self.add_to_frontier(f, &mut frontier);
                }
                self.add_clauses_mux(node, ci, ct, ce);
                self.set_cone(node, fanins);
            } else {
                let sup = self.collect_super(node, USE_MUXES);
                for &e in &sup {
                    self.add_to_frontier(e.nid(), &mut frontier);
                }
                self.add_clauses_super(node, &sup);
                let fanins = sup.iter().map(|e| e.nid()).collect();
                self.set_cone(node, fanins);
            }
        }
    }
}

impl FraigMan {
    /// Hand the node a variable if it has none; AND gates additionally
    /// queue up for clauseification, inputs register for model readout.
    fn add_to_frontier(&mut self, n: NodeId, frontier: &mut Vec<NodeId>) {
        if n == CONST1 || self.sat_var(n).is_some() {
            return;
        }
        let solver = self.solver.as_mut().expect("no solver");
        let v = solver.num_vars();
        solver.ensure_vars(v + 1);
        self.set_sat_var(n, v);
        if self.fraig.is_and(n) {
            frontier.push(n);
        } else if self.fraig.is_ci(n) {
            self.pi_vars.push(n);
        }
    }

    /// The largest single-output AND cluster rooted at the node: recursion
    /// stops at complemented edges, inputs, shared nodes, and (optionally)
    /// MUX tops.
    pub(crate) fn collect_super(&self, n: NodeId, use_muxes: bool) -> Vec<Edge> {
        debug_assert!(self.fraig.is_and(n));
        let mut sup = Vec::with_capacity(4);
        self.collect_super_rec(self.fraig.fanin0(n), use_muxes, &mut sup);
        self.collect_super_rec(self.fraig.fanin1(n), use_muxes, &mut sup);
        sup
    }

    fn collect_super_rec(&self, e: Edge, use_muxes: bool, sup: &mut Vec<Edge>) {
        let n = e.nid();
        if e.compl()
            || !self.fraig.is_and(n)
            || self.fraig.node(n).refs > 1
            || (use_muxes && self.fraig.is_mux_type(n))
        {
            if !sup.contains(&e) {
                sup.push(e);
            }
            return;
        }
        self.collect_super_rec(self.fraig.fanin0(n), use_muxes, sup);
        self.collect_super_rec(self.fraig.fanin1(n), use_muxes, sup);
    }

    /// The literal asserting an edge's value true.
    fn edge_lit(&self, e: Edge) -> Lit {
        let v = self.sat_var(e.nid()).expect("fanin without a variable");
        var_lit(v, e.compl())
    }

    /// Tseitin encoding of `node = AND(sup)`: one binary implication per
    /// fanin plus the (n+1)-ary conjunction clause.
    fn add_clauses_super(&mut self, node: NodeId, sup: &[Edge]) {
        debug_assert!(1 < sup.len());
        let nv = self.sat_var(node).expect("node without a variable");
        let out_pos = var_lit(nv, false);
        let out_neg = var_lit(nv, true);
        let mut long: Vec<Lit> = Vec::with_capacity(sup.len() + 1);
        for &e in sup {
            let fl = self.edge_lit(e);
            let ok = self
                .solver
                .as_mut()
                .expect("no solver")
                .add_clause(&[fl, out_neg]);
            debug_assert!(ok);
            long.push(fl.negate());
        }
        long.push(out_pos);
        let ok = self.solver.as_mut().expect("no solver").add_clause(&long);
        debug_assert!(ok);
    }

    /// Encoding of `node = ITE(i, t, e)`: the four selector clauses plus
    /// the two consensus implications (dropped when both branches share a
    /// variable).
    fn add_clauses_mux(&mut self, node: NodeId, ci: Edge, ct: Edge, ce: Edge) {
        let vf = self.sat_var(node).expect("node without a variable");
        let vi = self.sat_var(ci.nid()).expect("mux control without a variable");
        let vt = self.sat_var(ct.nid()).expect("mux branch without a variable");
        let ve = self.sat_var(ce.nid()).expect("mux branch without a variable");
        debug_assert!(!ci.compl());
        let (fc_t, fc_e) = (ct.compl(), ce.compl());
        let solver = self.solver.as_mut().expect("no solver");
        let mut add = |lits: &[Lit]| {
            let ok = solver.add_clause(lits);
            debug_assert!(ok);
        };
        // i & t -> f ; i & !t -> !f
        add(&[var_lit(vi, true), var_lit(vt, !fc_t), var_lit(vf, false)]);
        add(&[var_lit(vi, true), var_lit(vt, fc_t), var_lit(vf, true)]);
        // !i & e -> f ; !i & !e -> !f
        add(&[var_lit(vi, false), var_lit(ve, !fc_e), var_lit(vf, false)]);
        add(&[var_lit(vi, false), var_lit(ve, fc_e), var_lit(vf, true)]);
        if vt == ve {
            return;
        }
        // !t & !e -> !f ; t & e -> f
        add(&[var_lit(vt, fc_t), var_lit(ve, fc_e), var_lit(vf, true)]);
        add(&[var_lit(vt, !fc_t), var_lit(ve, !fc_e), var_lit(vf, false)]);
    }
}
