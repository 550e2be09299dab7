//! The BMC prefix stage: unroll initialized timeframes, functionally
//! reduce them with the combinational sweep, and refine the candidate
//! classes under an oracle that demands equivalence in every non-prefix
//! initialized frame. Candidates broken by any state reachable within the
//! unrolling die here, before induction ever sees them.
use {
    crate::{
        aig::Aig,
        classes::RefineIF,
        config::Config,
        man::FraigMan,
        state::Stat,
        sweep,
        types::*,
    },
};

/// conflict budget for sweeping the initialized frames
const BMC_BT_LIMIT: u64 = 1_000_000;

/// Equality of two original nodes across the fraiged initialized frames.
/// Each node's per-frame image edge is normalized by the node's phase bit,
/// so candidate equivalence up to complement is plain edge equality and a
/// candidate constant reads as the constant-0 edge in every frame.
struct BmcOracle<'a> {
    aig: &'a Aig,
    npref: usize,
    nframes_all: usize,
    /// original node and frame to frames-graph edge
    to_frames: &'a [Option<Edge>],
    /// frames-graph node to fraiged-graph edge
    to_fraig: &'a [Option<Edge>],
}

impl<'a> BmcOracle<'a> {
    fn normalized_edge(&self, n: NodeId, f: usize) -> Edge {
        let e = self.to_frames[n * self.nframes_all + f].expect("frame image not built");
        let full = self.to_fraig[e.nid()]
            .expect("fraig image not built")
            .flip_cond(e.compl());
        full.flip_cond(self.aig.phase(n))
    }
}

impl<'a> RefineIF for BmcOracle<'a> {
    fn node_hash(&self, n: NodeId, table_size: usize) -> usize {
        debug_assert!(table_size > 0);
        let mut key = 0usize;
        let mut constant = true;
        for f in self.npref..self.nframes_all {
            let e = self.normalized_edge(n, f);
            constant &= e == EDGE_FALSE;
            key = key
                .rotate_left(7)
                .wrapping_add((e as usize).wrapping_mul(0x9e37_79b9));
        }
        if constant {
            return 0;
        }
        key % table_size
    }

    fn node_is_const(&self, n: NodeId) -> bool {
        (self.npref..self.nframes_all).all(|f| self.normalized_edge(n, f) == EDGE_FALSE)
    }

    fn nodes_are_equal(&self, a: NodeId, b: NodeId) -> bool {
        (self.npref..self.nframes_all)
            .all(|f| self.normalized_edge(a, f) == self.normalized_edge(b, f))
    }
}

/// Unroll `nframes` initialized frames: fresh inputs per frame, frame-0
/// registers tied to constant 0, register inputs feeding the next frame.
/// Returns the frames graph and the per-node per-frame image map.
fn bmc_frames(aig: &Aig, nframes: usize) -> (Aig, Vec<Option<Edge>>) {
    let mut frames = Aig::new();
    let mut map: Vec<Option<Edge>> = vec![None; aig.num_nodes() * nframes];
    let at = |n: NodeId, f: usize| n * nframes + f;
    for f in 0..nframes {
        map[at(CONST1, f)] = Some(EDGE_TRUE);
    }
    for f in 0..nframes {
        for &pi in aig.pis() {
            map[at(pi, f)] = Some(frames.add_ci().edge(false));
        }
    }
    for &lo in aig.latch_outs() {
        map[at(lo, 0)] = Some(EDGE_FALSE);
    }
    let child = |map: &[Option<Edge>], e: Edge, f: usize| {
        map[at(e.nid(), f)]
            .expect("fanin image not built")
            .flip_cond(e.compl())
    };
    for f in 0..nframes {
        for n in aig.ands() {
            let i0 = child(&map, aig.fanin0(n), f);
            let i1 = child(&map, aig.fanin1(n), f);
            let img = frames.and(i0, i1);
            map[at(n, f)] = Some(img);
        }
        if f + 1 == nframes {
            break;
        }
        let transfers: Vec<Edge> = aig
            .latch_ins()
            .iter()
            .map(|&li| child(&map, aig.fanin0(li), f))
            .collect();
        for (&lo, img) in aig.latch_outs().iter().zip(transfers) {
            map[at(lo, f + 1)] = Some(img);
        }
    }
    (frames, map)
}

/// Run the prefix stage on the engine's classes: `npref` warm-up frames
/// excluded from the oracle, `ndepth` frames that must agree.
pub(crate) fn bmc_perform(p: &mut FraigMan, npref: usize, ndepth: usize) {
    let nframes_all = npref + ndepth;
    let (frames, to_frames) = bmc_frames(&p.aig, nframes_all);
    let cfg = Config {
        bt_limit_node: BMC_BT_LIMIT,
        seed: p.cfg.seed,
        ..Config::default()
    };
    let (_, to_fraig, _) = sweep::fraig_with_images(&frames, &cfg);
    let FraigMan {
        ref aig,
        ref mut cla,
        ..
    } = *p;
    let oracle = BmcOracle {
        aig,
        npref,
        nframes_all,
        to_frames: &to_frames,
        to_fraig: &to_fraig,
    };
    let before = cla.count_lits();
    let mut splits = cla.refine(&oracle);
    splits += cla.refine_const(&oracle);
    let after = cla.count_lits();
    p.stats[Stat::Refinements] += splits as u64;
    tracing::debug!(
        frames = nframes_all,
        lits_before = before,
        lits_after = after,
        "prefix refinement done"
    );
}

#[cfg(test)]
mod tests {
    use {super::*, crate::classes::ClassDB};

    /// A register that is 0 in every reachable state (it reloads itself)
    /// next to one that toggles: random sequential simulation from reset
    /// may alias them, the initialized unrolling must not.
    #[test]
    fn prefix_stage_kills_unreachable_aliases() {
        let mut aig = Aig::new();
        let stuck = aig.add_ci().edge(false); // register 0, reloads itself
        let tog = aig.add_ci().edge(false); // register 1, inverts itself
        aig.add_co(stuck);
        aig.add_co(tog.flip());
        aig.set_num_regs(2);
        let (frames, map) = bmc_frames(&aig, 3);
        // 3 frames, no primary inputs: everything folds to constants
        assert_eq!(0, frames.num_ands());
        let at = |n: NodeId, f: usize| n * 3 + f;
        // stuck register: 0 in every frame
        for f in 0..3 {
            assert_eq!(Some(EDGE_FALSE), map[at(stuck.nid(), f)]);
        }
        // toggler: 0, 1, 0
        assert_eq!(Some(EDGE_FALSE), map[at(tog.nid(), 0)]);
        assert_eq!(Some(EDGE_TRUE), map[at(tog.nid(), 1)]);
        assert_eq!(Some(EDGE_FALSE), map[at(tog.nid(), 2)]);

        let cfg = Config::default();
        let (_, to_fraig, _) = sweep::fraig_with_images(&frames, &cfg);
        let oracle = BmcOracle {
            aig: &aig,
            npref: 0,
            nframes_all: 3,
            to_frames: &map,
            to_fraig: &to_fraig,
        };
        assert!(oracle.node_is_const(stuck.nid()));
        assert!(!oracle.node_is_const(tog.nid()));
        assert!(!oracle.nodes_are_equal(stuck.nid(), tog.nid()));

        // preparing register classes under the oracle separates them
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, true, 0);
        assert_eq!(0, cla.num_classes());
        assert_eq!(vec![stuck.nid()], cla.const_class().to_vec());
    }
}
