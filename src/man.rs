//! The engine manager: the original graph, the growing image graph, the
//! per-frame image map, the class database, the simulator, the solver-side
//! node maps, and the counter-example pattern buffer.
use {
    crate::{
        aig::Aig,
        classes::ClassDB,
        config::Config,
        sim::Simulator,
        solver::{SatSolverIF, Solver},
        state::{Stat, Stats},
        types::*,
    },
    rand::{rngs::StdRng, SeedableRng},
};

pub struct FraigMan {
    pub(crate) cfg: Config,
    /// the starting graph; logically read-only during a run
    pub(crate) aig: Aig,
    /// the image graph under construction (one frame for the combinational
    /// sweep, `frames_ind + 1` unrolled frames for induction)
    pub(crate) fraig: Aig,
    pub(crate) nframes_all: usize,
    /// original node and frame index to image edge
    images: Vec<Option<Edge>>,
    pub(crate) cla: ClassDB,
    pub(crate) sml: Simulator,
    pub(crate) rng: StdRng,
    pub(crate) solver: Option<Solver>,
    /// image node to SAT variable
    sat_num: Vec<Option<Var>>,
    /// image node to clauseified supergate leaves
    cone: Vec<Option<Vec<NodeId>>>,
    /// image inputs holding SAT variables, for model readout
    pub(crate) pi_vars: Vec<NodeId>,
    /// original nodes left self-representing because a proof timed out
    pub(crate) timeouts: Vec<NodeId>,
    /// live one-hotness clauses over register pairs, when derived
    pub(crate) one_hots: Option<Vec<crate::hot::OneHot>>,
    /// bit-packed counter-example over the image graph's inputs
    pat: Vec<u32>,
    pat_pending: bool,
    pub stats: Stats,
}

impl FraigMan {
    pub fn new(aig: &Aig, cfg: &Config) -> FraigMan {
        let nframes_all = cfg.frames_ind + 1;
        let cla = ClassDB::new(aig);
        let sml = Simulator::new(aig, 0, nframes_all, cfg.sim_words);
        let npat_bits = aig.num_pis() * nframes_all + aig.num_regs();
        let mut stats = Stats::default();
        stats.nodes_beg = aig.num_ands();
        stats.regs_beg = aig.num_regs();
        FraigMan {
            cfg: cfg.clone(),
            aig: aig.clone(),
            fraig: Aig::new(),
            nframes_all,
            images: vec![None; aig.num_nodes() * nframes_all],
            cla,
            sml,
            rng: StdRng::seed_from_u64(cfg.seed),
            solver: None,
            sat_num: Vec::new(),
            cone: Vec::new(),
            pi_vars: Vec::new(),
            timeouts: Vec::new(),
            one_hots: None,
            pat: vec![0; (npat_bits + 31) / 32],
            pat_pending: false,
            stats,
        }
    }

    /// Restart the pseudorandom stream; called at the top of each major
    /// phase so identical inputs reduce identically.
    pub(crate) fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.cfg.seed);
    }

    //
    //## image map
    //

    pub(crate) fn image(&self, n: NodeId, frame: usize) -> Option<Edge> {
        self.images[n * self.nframes_all + frame]
    }

    pub(crate) fn set_image(&mut self, n: NodeId, frame: usize, e: Edge) {
        self.images[n * self.nframes_all + frame] = Some(e);
    }

    /// image of a fanin edge: the fanin's image with the edge complement
    /// applied.
    pub(crate) fn child_image(&self, e: Edge, frame: usize) -> Edge {
        self.image(e.nid(), frame)
            .expect("fanin image not built")
            .flip_cond(e.compl())
    }

    pub(crate) fn clear_images(&mut self) {
        for e in &mut self.images {
            *e = None;
        }
    }

    /// Fresh image graph with an input for every original input; frame 0
    /// only (the combinational arrangement).
    pub(crate) fn prepare_comb(&mut self) {
        debug_assert_eq!(1, self.nframes_all);
        self.fraig = Aig::new();
        self.set_image(CONST1, 0, EDGE_TRUE);
        for i in 0..self.aig.num_cis() {
            let ci = self.aig.ci(i);
            let img = self.fraig.add_ci().edge(false);
            self.set_image(ci, 0, img);
        }
    }

    /// Route every original output through its image and close the graph.
    pub(crate) fn finalize_comb(&mut self) {
        for i in 0..self.aig.num_cos() {
            let d = self.aig.co_driver(i);
            let img = self.child_image(d, 0);
            self.fraig.add_co(img);
        }
        self.fraig.set_num_regs(self.aig.num_regs());
    }

    //
    //## solver-side maps
    //

    /// Make sure the solver exists, with variable 0 reserved for the
    /// constant-1 node and asserted true.
    pub(crate) fn start_solver(&mut self) {
        if self.solver.is_some() {
            return;
        }
        let mut solver = Solver::new();
        solver.ensure_vars(1);
        let ok = solver.add_clause(&[var_lit(0, false)]);
        debug_assert!(ok);
        self.solver = Some(solver);
        self.grow_sat_maps();
        self.sat_num[CONST1] = Some(0);
    }

    /// Drop the solver and every image-node map tied to it; the next query
    /// starts from a clean incremental state.
    pub(crate) fn clean_sat(&mut self) {
        self.solver = None;
        self.sat_num.clear();
        self.cone.clear();
        self.pi_vars.clear();
    }

    pub(crate) fn grow_sat_maps(&mut self) {
        let n = self.fraig.num_nodes();
        if self.sat_num.len() < n {
            self.sat_num.resize(n, None);
            self.cone.resize(n, None);
        }
    }

    pub(crate) fn sat_var(&self, n: NodeId) -> Option<Var> {
        self.sat_num.get(n).copied().flatten()
    }

    pub(crate) fn set_sat_var(&mut self, n: NodeId, v: Var) {
        self.grow_sat_maps();
        self.sat_num[n] = Some(v);
    }

    pub(crate) fn cone_of(&self, n: NodeId) -> Option<&Vec<NodeId>> {
        self.cone.get(n).and_then(|c| c.as_ref())
    }

    pub(crate) fn set_cone(&mut self, n: NodeId, fanins: Vec<NodeId>) {
        self.grow_sat_maps();
        self.cone[n] = Some(fanins);
    }

    /// The failed mark lives on the image node, so clearing for a fresh
    /// iteration comes free with rebuilding the image graph; a later
    /// relaxed-budget rerun starts unmarked.
    pub(crate) fn is_failed(&self, n: NodeId) -> bool {
        self.fraig.node(n).flags.contains(NodeFlag::FAILED)
    }

    pub(crate) fn set_failed(&mut self, n: NodeId) {
        self.fraig.node_mut(n).flags.insert(NodeFlag::FAILED);
    }

    /// `true` once the global conflict or propagation budget is spent.
    pub(crate) fn global_budget_exceeded(&self) -> bool {
        match &self.solver {
            None => false,
            Some(s) => {
                (self.cfg.bt_limit_global > 0
                    && self.cfg.bt_limit_global <= s.num_conflicts())
                    || (self.cfg.ins_limit_global > 0
                        && self.cfg.ins_limit_global <= s.num_propagations())
            }
        }
    }

    //
    //## counter-example plumbing
    //

    /// Copy the solver model over the recorded input variables into the
    /// pattern buffer. Input `i` of the image graph owns pattern bit `i`.
    pub(crate) fn save_pattern(&mut self) {
        let FraigMan {
            ref solver,
            ref mut pat,
            ref pi_vars,
            ref sat_num,
            ref fraig,
            ..
        } = *self;
        let solver = solver.as_ref().expect("no solver");
        for w in pat.iter_mut() {
            *w = 0;
        }
        for &ci in pi_vars {
            let v = sat_num[ci].expect("input without a variable");
            if solver.var_value(v) {
                let bit = fraig.node(ci).cio_id as usize;
                pat[bit / 32] |= 1 << (bit % 32);
            }
        }
        self.pat_pending = true;
    }

    /// Replay the saved counter-example: inject it (with its distance-1
    /// neighborhood) into the simulator, re-propagate, and refine the
    /// classes, which must separate the refuted pair.
    pub(crate) fn resimulate(&mut self) {
        debug_assert!(self.pat_pending);
        let FraigMan {
            ref mut sml,
            ref aig,
            ref pat,
            ..
        } = *self;
        sml.assign_dist1(aig, pat);
        sml.propagate(aig);
        self.pat_pending = false;
        self.stats[Stat::SimRounds] += 1;
        let FraigMan {
            ref mut cla,
            ref sml,
            ..
        } = *self;
        let mut splits = cla.refine(sml);
        splits += cla.refine_const(sml);
        splits += self.one_hot_refine();
        self.stats[Stat::Refinements] += splits as u64;
        if splits == 0 {
            tracing::debug!("counter-example produced no refinement");
        }
    }
}
