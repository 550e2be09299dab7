//! k-induction with speculative reduction: unroll `k+1` timeframes,
//! substitute class representatives while unrolling, assert the
//! speculation miters to zero as the inductive hypothesis, and discharge
//! every class at the last frame with the prover. A refuted candidate
//! lifts its counter-example (per-frame inputs plus the initial register
//! state) back into the sequential simulator, the classes refine, and the
//! frames are rebuilt, until no class shrinks.
use {
    crate::{
        aig::Aig,
        bmc,
        cnf::CnfIF,
        config::Config,
        hot,
        man::FraigMan,
        sim::Simulator,
        solver::SatSolverIF,
        state::Stat,
        sweep::FraigResult,
        types::*,
    },
};

/// frames of initialized simulation used to seed the candidate classes
const SEED_SIM_FRAMES: usize = 32;

/// Sequential SAT sweeping: returns the reduced graph with every proved
/// class collapsed onto its representative.
pub fn fraig_induction(aig: &Aig, cfg: &Config) -> MaybeReduced<FraigResult> {
    if aig.num_regs() == 0 {
        return Err(FraigError::NotSequential);
    }
    if cfg.frames_ind == 0 {
        return Err(FraigError::BadDepth);
    }
    let mut p = FraigMan::new(aig, cfg);
    if aig.num_ands() == 0 {
        let reduced = aig.dup_with_reprs(&vec![None; aig.num_nodes()]);
        return Ok(FraigResult {
            aig: reduced,
            stats: p.stats,
            equivs: Vec::new(),
        });
    }

    // seed the classes from a long initialized simulation
    p.reseed();
    {
        let mut seed_sml = Simulator::new(aig, cfg.frames_pref, cfg.frames_pref + SEED_SIM_FRAMES, 1);
        seed_sml.simulate(aig, &mut p.rng, true);
        p.stats[Stat::SimRounds] += 1;
        p.cla
            .prepare(aig, &seed_sml, cfg.latch_corr, cfg.max_levels);
        if cfg.use_one_hot {
            // the clauses constrain one frame, so only simple induction
            // without a prefix can carry them
            if cfg.frames_pref > 0 || cfg.frames_ind != 1 {
                tracing::warn!("one-hotness needs frames_pref = 0 and frames_ind = 1; skipped");
            } else {
                p.one_hots = Some(hot::one_hot_compute(aig, &seed_sml));
            }
        }
    }
    // the replay simulator covers the k+1 uninitialized frames
    p.sml = Simulator::new(aig, 0, cfg.frames_ind + 1, cfg.sim_words);

    // prefix refinement: only candidates provably equivalent in all
    // initialized frames enter the induction
    bmc::bmc_perform(&mut p, cfg.frames_pref, cfg.frames_ind + 1);
    p.stats.lits_beg = p.cla.count_lits();
    let hots0 = p.one_hots.as_deref().map_or(0, hot::one_hot_count);
    p.stats.progress.push(p.cla.count_lits() + hots0);

    let mut iters = 0;
    loop {
        iters += 1;
        let lits_old = p.cla.count_lits();
        let hots_old = p.one_hots.as_deref().map_or(0, hot::one_hot_count);
        p.cla.reset_refined();
        p.clear_images();
        p.clean_sat();
        let nasserts = p.frames_with_classes();
        if cfg.rewrite {
            tracing::debug!("rewrite hook set, but no external pass is wired in");
        }
        p.assert_constraints(nasserts);
        if !p.one_hot_assume() {
            // a contradictory clause set cannot serve as a hypothesis
            p.one_hots = None;
            p.clean_sat();
            p.start_solver();
            p.assert_constraints(nasserts);
        }
        p.one_hot_check(cfg.frames_ind);
        p.sweep(cfg.frames_ind);
        let hots_now = p.one_hots.as_deref().map_or(0, hot::one_hot_count);
        p.stats.progress.push(p.cla.count_lits() + hots_now);
        tracing::debug!(
            iter = iters,
            asserts = nasserts,
            lits = p.cla.count_lits(),
            pairs = p.cla.count_pairs(),
            consts = p.cla.const_class().len(),
            classes = p.cla.num_classes(),
            hots = hots_now,
            "induction iteration done"
        );
        if (!p.cla.refined() && hots_now == hots_old) || p.stats.saturated {
            break;
        }
        if p.cla.count_lits() == lits_old && hots_now == hots_old {
            // refinement must shrink something; a stall would never
            // converge
            tracing::warn!("class refinement stalled; giving up the fixed point");
            break;
        }
    }
    p.stats.iters = iters;
    p.stats.one_hots = p.one_hots.as_deref().map_or(0, hot::one_hot_count);

    p.cla.select_repr(aig);
    let reprs = p.cla.copy_reprs(&p.timeouts);
    let reduced = aig.dup_with_reprs(&reprs);
    let equivs = (0..aig.num_nodes())
        .filter_map(|n| reprs[n].map(|r| (r, n, aig.phase(n) ^ aig.phase(r))))
        .collect();
    p.stats.lits_end = p.cla.count_lits();
    p.stats.nodes_end = reduced.num_ands();
    p.stats.regs_end = reduced.num_regs();
    tracing::debug!(stats = %p.stats, "induction done");
    Ok(FraigResult {
        aig: reduced,
        stats: p.stats,
        equivs,
    })
}

impl FraigMan {
    /// Build `k+1` timeframes over fresh per-frame inputs, substituting
    /// representatives for class members as frames are emitted and
    /// recording one miter output per substitution. Returns the number of
    /// speculation miters; the register images of the last frame follow
    /// them in the output list.
    pub(crate) fn frames_with_classes(&mut self) -> usize {
        let nf = self.nframes_all;
        self.fraig = Aig::new();
        for f in 0..nf {
            self.set_image(CONST1, f, EDGE_TRUE);
        }
        for f in 0..nf {
            for i in 0..self.aig.num_pis() {
                let pi = self.aig.pis()[i];
                let img = self.fraig.add_ci().edge(false);
                self.set_image(pi, f, img);
            }
        }
        for i in 0..self.aig.num_regs() {
            let lo = self.aig.latch_outs()[i];
            let img = self.fraig.add_ci().edge(false);
            self.set_image(lo, 0, img);
        }
        let ands: Vec<NodeId> = self.aig.ands().collect();
        for f in 0..nf - 1 {
            for i in 0..self.aig.num_regs() {
                let lo = self.aig.latch_outs()[i];
                self.constrain_node(lo, f);
            }
            for &n in &ands {
                let i0 = self.child_image(self.aig.fanin0(n), f);
                let i1 = self.child_image(self.aig.fanin1(n), f);
                let img = self.fraig.and(i0, i1);
                self.set_image(n, f, img);
                self.constrain_node(n, f);
            }
            for i in 0..self.aig.num_regs() {
                let li = self.aig.latch_ins()[i];
                let lo = self.aig.latch_outs()[i];
                let img = self.child_image(self.aig.fanin0(li), f);
                self.set_image(lo, f + 1, img);
            }
        }
        let nasserts = self.fraig.num_cos();
        for i in 0..self.aig.num_regs() {
            let lo = self.aig.latch_outs()[i];
            let img = self.image(lo, nf - 1).expect("last-frame register image");
            self.fraig.add_co(img);
        }
        nasserts
    }

    /// Speculative reduction of one node in one frame: reroute downstream
    /// logic through the representative's image and emit the miter
    /// recording the hypothesis. A constant representative degenerates the
    /// miter to `image ^ phase`, which is still emitted.
    fn constrain_node(&mut self, n: NodeId, frame: usize) {
        let re = match self.cla.repr_edge(&self.aig, n) {
            None => return,
            Some(e) => e,
        };
        let repr = re.nid();
        debug_assert!(repr < n);
        let img = self.image(n, frame).expect("image not built");
        let repr_img = self
            .image(repr, frame)
            .expect("representative image not built");
        if img.nid() == repr_img.nid() {
            return;
        }
        let subst = repr_img.flip_cond(re.compl());
        if self.cfg.speculate {
            self.set_image(n, frame, subst);
            self.stats[Stat::Speculations] += 1;
        }
        let miter = self.fraig.exor(img, subst);
        debug_assert_ne!(EDGE_TRUE, miter, "structurally refuted speculation");
        self.fraig.add_co(miter);
    }

    /// Clauseify the speculation miters and assert each to zero: the
    /// inductive hypothesis the last-frame queries run under.
    pub(crate) fn assert_constraints(&mut self, nasserts: usize) {
        self.start_solver();
        for i in 0..nasserts {
            let d = self.fraig.co_driver(i);
            if d == EDGE_FALSE {
                continue;
            }
            if d == EDGE_TRUE {
                tracing::warn!("dropping a structurally refuted hypothesis constraint");
                continue;
            }
            self.cnf_add_to_solver(None, Some(d.nid()));
            let v = self.sat_var(d.nid()).expect("constraint without a variable");
            let ok = self
                .solver
                .as_mut()
                .expect("no solver")
                .add_clause(&[var_lit(v, !d.compl())]);
            if !ok {
                // contradictory hypothesis; fall back to an unconstrained
                // solver so the last-frame checks stay sound
                tracing::warn!("hypothesis constraints are contradictory; rebuilding");
                self.clean_sat();
                self.start_solver();
                return;
            }
        }
        let ok = self.solver.as_mut().expect("no solver").simplify();
        if !ok {
            tracing::warn!("hypothesis constraints are contradictory; rebuilding");
            self.clean_sat();
            self.start_solver();
        }
    }
}
