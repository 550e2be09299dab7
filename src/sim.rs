//! Bit-parallel simulation over one or more timeframes.
//!
//! Each node owns a contiguous block of 32-bit words, one sub-block per
//! frame; bit `b` of word `w` is the node's value under pattern `w*32+b`.
//! Blocks are stored *phase-normalized*: a node's block equals its function
//! XOR its phase bit. Two nodes are then candidate-equivalent up to
//! complement iff their blocks are equal, and candidate-constant iff the
//! block is zero, so the refinement oracle needs no polarity fixup.
use {
    crate::{
        aig::{Aig, NodeKind},
        classes::RefineIF,
        types::*,
    },
    rand::{rngs::StdRng, Rng},
};

const WORD_BITS: usize = 32;

/// mixing constants for the simulation-signature hash
const HASH_PRIMES: [u32; 16] = [
    0x984b_6ad9, 0x18a6_eed3, 0x950c_9cc5, 0x65e2_63cd, 0xcbb9_66ab, 0x4cd2_a829, 0x5978_9b0f,
    0xc46b_e0c1, 0x8068_03e5, 0x5d8c_5e89, 0x85ff_8b4f, 0x2a65_0f3b, 0x44ab_55d5, 0x6d22_6816,
    0x9bbc_9e67, 0x41a4_7c0d,
];

/// The simulation manager: per-node pattern blocks plus the bookkeeping
/// needed to slice them by frame and to exclude the prefix from hashing.
#[derive(Clone, Debug)]
pub struct Simulator {
    /// number of prefix frames excluded from the oracles
    npref: usize,
    nframes: usize,
    nwords_frame: usize,
    nwords_total: usize,
    nwords_pref: usize,
    data: Vec<u32>,
    /// a true primary output evaluated non-zero during simulation
    nonconst_out: bool,
    rounds: usize,
}

fn mask(b: bool) -> u32 {
    if b {
        !0
    } else {
        0
    }
}

impl Simulator {
    pub fn new(aig: &Aig, npref: usize, nframes: usize, nwords_frame: usize) -> Simulator {
        debug_assert!(nframes > npref);
        let nwords_total = nframes * nwords_frame;
        Simulator {
            npref,
            nframes,
            nwords_frame,
            nwords_total,
            nwords_pref: npref * nwords_frame,
            data: vec![0; aig.num_nodes() * nwords_total],
            nonconst_out: false,
            rounds: 0,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.nframes
    }
    pub fn words_per_frame(&self) -> usize {
        self.nwords_frame
    }
    pub fn pattern_bits_per_frame(&self) -> usize {
        self.nwords_frame * WORD_BITS
    }
    pub fn rounds(&self) -> usize {
        self.rounds
    }
    /// whether a true primary output ever evaluated non-zero.
    pub fn nonconst_output_seen(&self) -> bool {
        self.nonconst_out
    }

    fn base(&self, n: NodeId) -> usize {
        n * self.nwords_total
    }

    pub fn block(&self, n: NodeId) -> &[u32] {
        &self.data[self.base(n)..self.base(n) + self.nwords_total]
    }

    /// Fill the combinational-input blocks. Primary inputs draw fresh
    /// pseudorandom words for every frame; register outputs of frame 0 are
    /// zeroed when `init` holds (the reset state) and randomized otherwise.
    pub fn randomize(&mut self, aig: &Aig, rng: &mut StdRng, init: bool) {
        for &pi in aig.pis() {
            let base = self.base(pi);
            for w in 0..self.nwords_total {
                self.data[base + w] = rng.gen();
            }
        }
        for &lo in aig.latch_outs() {
            let base = self.base(lo);
            for w in 0..self.nwords_frame {
                self.data[base + w] = if init { 0 } else { rng.gen() };
            }
        }
    }

    /// Set every bit of one combinational input in one frame to `value`.
    pub fn assign_const(&mut self, n: NodeId, value: bool, frame: usize) {
        let base = self.base(n) + frame * self.nwords_frame;
        for w in 0..self.nwords_frame {
            self.data[base + w] = mask(value);
        }
    }

    /// Flip pattern `bit` of one combinational input in one frame.
    fn flip_bit(&mut self, n: NodeId, frame: usize, bit: usize) {
        let base = self.base(n) + frame * self.nwords_frame;
        self.data[base + bit / WORD_BITS] ^= 1 << (bit % WORD_BITS);
    }

    /// Load a saved counter-example: the pattern occupies bit 0 of every
    /// input block and each further bit position flips exactly one input
    /// relative to it, so one counter-example refines many candidates.
    ///
    /// Combinational layout (one frame): one pattern bit per input.
    /// Sequential layout: `num_pis * nframes` bits of per-frame primary
    /// inputs followed by the frame-0 register values.
    pub fn assign_dist1(&mut self, aig: &Aig, pat: &[u32]) {
        let pat_bit = |i: usize| pat[i / WORD_BITS] >> (i % WORD_BITS) & 1 != 0;
        if self.nframes == 1 {
            for (i, &ci) in aig.cis().iter().enumerate() {
                self.assign_const(ci, pat_bit(i), 0);
            }
            let limit = aig.num_cis().min(self.pattern_bits_per_frame() - 1);
            for i in 0..limit {
                self.flip_bit(aig.ci(i), 0, i + 1);
            }
        } else {
            let npis = aig.num_pis();
            for f in 0..self.nframes {
                for (i, &pi) in aig.pis().iter().enumerate() {
                    self.assign_const(pi, pat_bit(npis * f + i), f);
                }
            }
            for (k, &lo) in aig.latch_outs().iter().enumerate() {
                self.assign_const(lo, pat_bit(npis * self.nframes + k), 0);
            }
            // perturb the last frame only; earlier frames must replay the
            // counter-example exactly for the state to be reachable
            let limit = npis.min(self.pattern_bits_per_frame() - 1);
            for i in 0..limit {
                let pi = aig.pis()[i];
                self.flip_bit(pi, self.nframes - 1, i + 1);
            }
        }
    }

    /// Propagate the current input blocks through every frame, feeding
    /// register inputs of frame `f` into register outputs of frame `f+1`.
    pub fn propagate(&mut self, aig: &Aig) {
        let wf = self.nwords_frame;
        for f in 0..self.nframes {
            if f > 0 {
                for (&li, &lo) in aig.latch_ins().iter().zip(aig.latch_outs().iter()) {
                    // register outputs have phase 0: store the raw value
                    let m = mask(aig.phase(li));
                    let src = self.base(li) + (f - 1) * wf;
                    let dst = self.base(lo) + f * wf;
                    for w in 0..wf {
                        self.data[dst + w] = self.data[src + w] ^ m;
                    }
                }
            }
            for n in 0..aig.num_nodes() {
                match aig.kind(n) {
                    NodeKind::And => {
                        let f0 = aig.fanin0(n);
                        let f1 = aig.fanin1(n);
                        let m0 = mask(aig.edge_phase(f0));
                        let m1 = mask(aig.edge_phase(f1));
                        let mo = mask(aig.phase(n));
                        let o0 = self.base(f0.nid()) + f * wf;
                        let o1 = self.base(f1.nid()) + f * wf;
                        let od = self.base(n) + f * wf;
                        for w in 0..wf {
                            let v = (self.data[o0 + w] ^ m0) & (self.data[o1 + w] ^ m1);
                            self.data[od + w] = v ^ mo;
                        }
                    }
                    NodeKind::Co => {
                        // a normalized output block equals its driver's
                        let src = self.base(aig.fanin0(n).nid()) + f * wf;
                        let dst = self.base(n) + f * wf;
                        for w in 0..wf {
                            self.data[dst + w] = self.data[src + w];
                        }
                    }
                    _ => {}
                }
            }
        }
        self.rounds += 1;
        for i in 0..aig.num_pos() {
            let po = aig.co(i);
            let m = mask(aig.phase(po));
            let base = self.base(po);
            if self.data[base..base + self.nwords_total]
                .iter()
                .any(|&w| w ^ m != 0)
            {
                self.nonconst_out = true;
                break;
            }
        }
    }

    /// One full round: fresh inputs, then propagation.
    pub fn simulate(&mut self, aig: &Aig, rng: &mut StdRng, init: bool) {
        self.randomize(aig, rng, init);
        self.propagate(aig);
    }

    /// When a true primary output holds 1 somewhere in the current
    /// patterns, extract the input assignment of the first such position.
    /// Single-frame use only (the combinational miter arrangement).
    pub fn output_counterexample(&self, aig: &Aig) -> Option<Vec<bool>> {
        debug_assert_eq!(1, self.nframes);
        for i in 0..aig.num_pos() {
            let po = aig.co(i);
            let m = mask(aig.phase(po));
            for (w, &word) in self.block(po).iter().enumerate() {
                let raw = word ^ m;
                if raw != 0 {
                    let b = raw.trailing_zeros();
                    let cex = aig
                        .cis()
                        .iter()
                        .map(|&ci| self.block(ci)[w] >> b & 1 != 0)
                        .collect();
                    return Some(cex);
                }
            }
        }
        None
    }
}

impl RefineIF for Simulator {
    /// A running 32-bit mix of the node's non-prefix words, `0` reserved
    /// for constant blocks.
    fn node_hash(&self, n: NodeId, table_size: usize) -> usize {
        debug_assert!(table_size > 0);
        let blk = self.block(n);
        let mut key = 0u32;
        let mut any = false;
        for (i, &w) in blk[self.nwords_pref..].iter().enumerate() {
            any |= w != 0;
            key = key
                .rotate_left(5)
                .wrapping_add(w.wrapping_mul(HASH_PRIMES[i & 0xF]));
        }
        if !any {
            return 0;
        }
        (key as usize) % table_size
    }

    fn node_is_const(&self, n: NodeId) -> bool {
        self.block(n)[self.nwords_pref..].iter().all(|&w| w == 0)
    }

    fn nodes_are_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (pa, pb) = (self.block(a), self.block(b));
        pa[self.nwords_pref..] == pb[self.nwords_pref..]
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::SeedableRng,
    };

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn contradiction_simulates_as_constant() {
        let mut aig = Aig::new();
        let x = aig.add_ci().edge(false);
        let n = aig.and(x, x.flip());
        assert_eq!(EDGE_FALSE, n); // folded away, nothing to simulate
        let y = aig.add_ci().edge(false);
        let a = aig.and(x, y);
        let b = aig.and(x, y.flip());
        let both = aig.and(a, b); // x & y & !y == 0, structurally hidden
        let mut sml = Simulator::new(&aig, 0, 1, 8);
        sml.simulate(&aig, &mut rng(), false);
        assert!(sml.node_is_const(both.nid()));
        assert!(!sml.node_is_const(a.nid()));
    }

    #[test]
    fn equal_functions_have_equal_blocks() {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        let n1 = aig.and(a, b).flip(); // !(a & b)
        let n2 = {
            // !a | !b built through a second, structurally distinct cone
            let t = aig.and(a, a); // == a; folded
            let u = aig.and(t.flip(), b);
            let v = aig.and(a, b.flip());
            let w = aig.and(u.flip(), v.flip()).flip(); // u | v = a^b
            // (a^b) | !(a|b) == !(a&b)
            let z = aig.and(a.flip(), b.flip());
            aig.and(w.flip(), z.flip()).flip()
        };
        let mut sml = Simulator::new(&aig, 0, 1, 16);
        sml.simulate(&aig, &mut rng(), false);
        assert!(sml.nodes_are_equal(n1.nid(), n2.nid()));
        assert_eq!(
            sml.node_hash(n1.nid(), 97),
            sml.node_hash(n2.nid(), 97)
        );
    }

    #[test]
    fn dist1_pattern_lands_in_bit_zero() {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        let n = aig.and(a, b);
        aig.add_co(n);
        let mut sml = Simulator::new(&aig, 0, 1, 4);
        // pattern a=1, b=1
        sml.assign_dist1(&aig, &[0b11]);
        sml.propagate(&aig);
        // stored block is phase-normalized; phase(n) is false
        assert_eq!(1, sml.block(n.nid())[0] & 1);
        // bit 1 flips input a, so the AND drops to 0 there
        assert_eq!(0, sml.block(n.nid())[0] >> 1 & 1);
    }

    #[test]
    fn output_counterexample_points_at_a_hit() {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        let n = aig.and(a, b.flip());
        aig.add_co(n);
        let mut sml = Simulator::new(&aig, 0, 1, 2);
        sml.simulate(&aig, &mut rng(), false);
        // a & !b fires somewhere among 64 random patterns
        assert!(sml.nonconst_output_seen());
        let cex = sml.output_counterexample(&aig).expect("hit expected");
        assert_eq!(vec![true, false], cex);
    }

    #[test]
    fn sequential_transfer_feeds_next_frame() {
        // single register fed by the primary input; po observes it
        let mut aig = Aig::new();
        let pi = aig.add_ci().edge(false);
        let lo = aig.add_ci().edge(false);
        aig.add_co(lo);
        aig.add_co(pi);
        aig.set_num_regs(1);
        let mut sml = Simulator::new(&aig, 0, 3, 2);
        sml.randomize(&aig, &mut rng(), true);
        sml.propagate(&aig);
        let pi_blk = sml.block(pi.nid()).to_vec();
        let lo_blk = sml.block(lo.nid()).to_vec();
        // frame 0 of the register output is the reset state
        assert_eq!(vec![0u32, 0], lo_blk[0..2].to_vec());
        // frame f+1 of the register equals frame f of its input
        assert_eq!(pi_blk[0..4].to_vec(), lo_blk[2..6].to_vec());
    }
}
