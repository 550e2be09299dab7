//! The combinational sweep: walk the original graph leaves-first, build
//! each node's image by hashed AND, and discharge its candidate
//! equivalence with the prover. A refuted candidate replays its
//! counter-example through the simulator, which splits the classes; a
//! timed-out one stays separate and is remembered as failed.
use {
    crate::{
        aig::Aig,
        config::Config,
        man::FraigMan,
        sat::ProveIF,
        state::{Stat, Stats},
        types::*,
    },
};

/// The outcome of a reduction: the reduced graph, the run record, and
/// every equivalence actually emitted, as `(representative, member,
/// complemented)` triples over the original graph's node ids.
#[derive(Debug)]
pub struct FraigResult {
    pub aig: Aig,
    pub stats: Stats,
    pub equivs: Vec<(NodeId, NodeId, bool)>,
}

/// Functionally reduce a combinational graph. Register outputs, if any,
/// are treated as free inputs.
pub fn fraig_perform(aig: &Aig, cfg: &Config) -> FraigResult {
    let (fraig, images, mut stats) = fraig_with_images(aig, cfg);
    // drop images that were merged away
    let reduced = fraig.dup_with_reprs(&vec![None; fraig.num_nodes()]);
    stats.nodes_end = reduced.num_ands();
    FraigResult {
        aig: reduced,
        stats,
        equivs: collect_equivs(aig, &images),
    }
}

/// Nodes that ended up sharing an image node were merged, by proof or by
/// hashing; each such group yields one triple per follower. A constant
/// image pairs the node with the constant-1 node.
fn collect_equivs(aig: &Aig, images: &[Option<Edge>]) -> Vec<(NodeId, NodeId, bool)> {
    let mut head_of: std::collections::HashMap<NodeId, (NodeId, bool)> =
        std::collections::HashMap::new();
    head_of.insert(CONST1, (CONST1, false));
    let mut equivs = Vec::new();
    for n in aig.ands() {
        if let Some(img) = images[n] {
            match head_of.get(&img.nid()) {
                Some(&(head, hc)) => equivs.push((head, n, img.compl() ^ hc)),
                None => {
                    head_of.insert(img.nid(), (n, img.compl()));
                }
            }
        }
    }
    equivs
}

/// Like [`fraig_perform`], additionally returning the image edge of every
/// original node (the mapping the BMC stage consumes).
pub(crate) fn fraig_with_images(aig: &Aig, cfg: &Config) -> (Aig, Vec<Option<Edge>>, Stats) {
    debug_assert_eq!(0, cfg.frames_ind);
    let mut p = FraigMan::new(aig, cfg);
    p.reseed();
    p.simulate_and_prepare(false);
    p.stats.lits_beg = p.cla.count_lits();
    p.prepare_comb();
    p.sweep(0);
    p.finalize_comb();
    p.stats.lits_end = p.cla.count_lits();
    p.stats.nodes_end = p.fraig.num_ands();
    p.stats.regs_end = p.fraig.num_regs();
    tracing::debug!(stats = %p.stats, "combinational sweep done");
    let images: Vec<Option<Edge>> = (0..aig.num_nodes()).map(|n| p.image(n, 0)).collect();
    (p.fraig, images, p.stats)
}

/// Classify the primary outputs of a (reduced) miter.
pub fn miter_status(aig: &Aig) -> MiterStatus {
    let mut undecided = false;
    for i in 0..aig.num_pos() {
        let d = aig.co_driver(i);
        if d == EDGE_FALSE {
            continue;
        }
        if d == EDGE_TRUE || aig.is_ci(d.nid()) {
            return MiterStatus::Disproved;
        }
        undecided = true;
    }
    if undecided {
        MiterStatus::Undecided
    } else {
        MiterStatus::Proved
    }
}

impl FraigMan {
    /// Initial random simulation, class creation, and further random
    /// rounds until the split rate saturates.
    pub(crate) fn simulate_and_prepare(&mut self, init: bool) {
        let FraigMan {
            ref mut sml,
            ref aig,
            ref mut rng,
            ..
        } = *self;
        sml.simulate(aig, rng, init);
        self.stats[Stat::SimRounds] += 1;
        let FraigMan {
            ref mut cla,
            ref sml,
            ref aig,
            ref cfg,
            ..
        } = *self;
        cla.prepare(aig, sml, cfg.latch_corr, cfg.max_levels);
        loop {
            let lits = self.cla.count_lits();
            if lits == 0 {
                break;
            }
            let FraigMan {
                ref mut sml,
                ref aig,
                ref mut rng,
                ..
            } = *self;
            sml.simulate(aig, rng, init);
            self.stats[Stat::SimRounds] += 1;
            let FraigMan {
                ref mut cla,
                ref sml,
                ..
            } = *self;
            let splits = cla.refine(sml) + cla.refine_const(sml);
            self.stats[Stat::Refinements] += splits as u64;
            if (splits as f64) < lits as f64 * self.cfg.sim_satur {
                break;
            }
        }
    }

    /// Sweep the original graph at the given frame: register outputs
    /// first (their images already exist), then every AND gate unless the
    /// run is restricted to register correspondence.
    pub(crate) fn sweep(&mut self, frame: usize) {
        let los: Vec<NodeId> = self.aig.latch_outs().to_vec();
        for n in los {
            self.fraig_node(n, frame);
        }
        if self.cfg.latch_corr {
            return;
        }
        let ands: Vec<NodeId> = self.aig.ands().collect();
        for n in ands {
            self.fraig_node(n, frame);
        }
    }

    /// Process one node: construct its image, look up its representative,
    /// and try to close the candidate with the prover.
    fn fraig_node(&mut self, n: NodeId, frame: usize) {
        if self.image(n, frame).is_none() {
            debug_assert!(self.aig.is_and(n));
            let i0 = self.child_image(self.aig.fanin0(n), frame);
            let i1 = self.child_image(self.aig.fanin1(n), frame);
            let img = self.fraig.and(i0, i1);
            self.set_image(n, frame, img);
        }
        let img = self.image(n, frame).expect("image just built");
        let repr = match self.cla.repr(n) {
            None => return, // a representative or a singleton
            Some(r) => r,
        };
        if repr == CONST1 {
            if !self.cfg.do_sparse || img.nid() == CONST1 {
                return;
            }
            match self.node_is_const_sat(img.nid()) {
                ProofStatus::Proved => {
                    // the image is the constant given by its zero-input value
                    let c = if self.fraig.edge_phase(img) {
                        EDGE_TRUE
                    } else {
                        EDGE_FALSE
                    };
                    self.set_image(n, frame, c);
                }
                ProofStatus::Disproved => self.resimulate(),
                ProofStatus::Timeout => self.timeouts.push(n),
            }
            return;
        }
        let repr_img = self
            .image(repr, frame)
            .expect("representative image not built");
        if repr_img.nid() == img.nid() {
            return; // already merged, possibly by speculation
        }
        match self.nodes_are_equiv(repr_img.nid(), img.nid()) {
            ProofStatus::Proved => {
                let merged = repr_img.flip_cond(self.aig.phase(n) ^ self.aig.phase(repr));
                self.set_image(n, frame, merged);
            }
            ProofStatus::Disproved => {
                self.resimulate();
                #[cfg(feature = "boundary_check")]
                assert_ne!(
                    Some(repr),
                    self.cla.repr(n),
                    "refutation did not split the class"
                );
            }
            ProofStatus::Timeout => self.timeouts.push(n),
        }
    }
}
