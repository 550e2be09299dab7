//! Candidate equivalence classes over AIG nodes and their refinement.
//!
//! The partition is an over-approximation of true equivalence, maintained
//! against a pluggable oracle: whatever implements [`RefineIF`] decides
//! hashing, constness and pairwise equality. The simulator is the usual
//! oracle; the BMC prefix stage swaps in a frame-accurate one.
use crate::{aig::Aig, types::*};

/// The capability set a refinement pass runs under.
pub trait RefineIF {
    /// hash of the node's signature, `0` reserved for constant signatures.
    fn node_hash(&self, n: NodeId, table_size: usize) -> usize;
    /// `true` if the node is a candidate constant.
    fn node_is_const(&self, n: NodeId) -> bool;
    /// `true` if the nodes are candidate-equivalent up to complement.
    fn nodes_are_equal(&self, a: NodeId, b: NodeId) -> bool;
}

/// The class database: one representative pointer per node, the list of
/// multi-member classes, and the distinguished constant-1 class.
///
/// Invariants: a class member's `repr` names the head of its class; the
/// head's `repr` is `None`; members of the constant class point at
/// [`CONST1`]. Polarity is implicit: under phase-normalized signatures the
/// complement between a member and its representative is always
/// `phase(member) ^ phase(repr)`.
#[derive(Clone, Debug)]
pub struct ClassDB {
    repr: Vec<Option<NodeId>>,
    classes: Vec<Vec<NodeId>>,
    class1: Vec<NodeId>,
    /// set whenever a refinement pass split or shrank something
    refined: bool,
}

impl ClassDB {
    pub fn new(aig: &Aig) -> ClassDB {
        ClassDB {
            repr: vec![None; aig.num_nodes()],
            classes: Vec::new(),
            class1: Vec::new(),
            refined: false,
        }
    }

    pub fn repr(&self, n: NodeId) -> Option<NodeId> {
        self.repr[n]
    }

    /// The signed reference of `n`'s representative.
    pub fn repr_edge(&self, aig: &Aig, n: NodeId) -> Option<Edge> {
        self.repr[n].map(|r| r.edge(aig.phase(n) ^ aig.phase(r)))
    }

    pub fn classes(&self) -> &[Vec<NodeId>] {
        &self.classes
    }
    pub fn const_class(&self) -> &[NodeId] {
        &self.class1
    }
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn refined(&self) -> bool {
        self.refined
    }
    pub fn reset_refined(&mut self) {
        self.refined = false;
    }

    /// Scan the oracle's signatures and group candidate nodes. With
    /// `latch_corr` only register outputs participate; otherwise all AND
    /// gates up to `max_levels` (0 = unbounded) plus, in sequential
    /// graphs, the register outputs. Constant-signature nodes join the
    /// constant class.
    pub fn prepare(
        &mut self,
        aig: &Aig,
        oracle: &impl RefineIF,
        latch_corr: bool,
        max_levels: usize,
    ) {
        self.repr = vec![None; aig.num_nodes()];
        self.classes.clear();
        self.class1.clear();
        let is_latch_out =
            |n: NodeId| aig.is_ci(n) && aig.node(n).cio_id as usize >= aig.num_pis();
        let mut candidates = Vec::new();
        for n in 1..aig.num_nodes() {
            let take = if latch_corr {
                is_latch_out(n)
            } else {
                (aig.is_and(n) && (max_levels == 0 || aig.level(n) as usize <= max_levels))
                    || (aig.num_regs() > 0 && is_latch_out(n))
            };
            if take {
                candidates.push(n);
            }
        }
        let table_size = candidates.len().max(1);
        let mut table: Vec<Vec<NodeId>> = vec![Vec::new(); table_size];
        for n in candidates {
            if oracle.node_is_const(n) {
                self.repr[n] = Some(CONST1);
                self.class1.push(n);
            } else {
                table[oracle.node_hash(n, table_size)].push(n);
            }
        }
        for bucket in table {
            if bucket.len() < 2 {
                continue;
            }
            let mut groups: Vec<Vec<NodeId>> = Vec::new();
            for n in bucket {
                match groups
                    .iter_mut()
                    .find(|g| oracle.nodes_are_equal(g[0], n))
                {
                    Some(g) => g.push(n),
                    None => groups.push(vec![n]),
                }
            }
            for g in groups {
                if g.len() < 2 {
                    continue;
                }
                for &m in &g[1..] {
                    self.repr[m] = Some(g[0]);
                }
                self.classes.push(g);
            }
        }
        tracing::debug!(
            classes = self.classes.len(),
            consts = self.class1.len(),
            lits = self.count_lits(),
            "classes prepared"
        );
    }

    /// Split every class that is no longer consistent under the oracle.
    /// Returns the number of splits performed.
    pub fn refine(&mut self, oracle: &impl RefineIF) -> usize {
        let mut splits = 0;
        let mut i = 0;
        // split-off tails are appended and reached by the same loop
        while i < self.classes.len() {
            splits += self.refine_class(i, false, oracle);
            i += 1;
        }
        self.classes.retain(|c| !c.is_empty());
        splits
    }

    /// Split one class against the oracle. With `refine_new` the split-off
    /// tail is refined recursively right away; otherwise it is appended as
    /// a single class. Returns the number of splits.
    pub fn refine_class(
        &mut self,
        idx: usize,
        refine_new: bool,
        oracle: &impl RefineIF,
    ) -> usize {
        let head = match self.classes[idx].first() {
            Some(&h) => h,
            None => return 0,
        };
        let mut eq = Vec::new();
        let mut neq = Vec::new();
        for &m in &self.classes[idx] {
            if m == head || oracle.nodes_are_equal(head, m) {
                eq.push(m);
            } else {
                neq.push(m);
            }
        }
        if neq.is_empty() {
            return 0;
        }
        self.refined = true;
        let mut splits = 1;
        if eq.len() == 1 {
            // the head lost every follower
            self.repr[head] = None;
            self.classes[idx].clear();
        } else {
            self.classes[idx] = eq;
        }
        if neq.len() == 1 {
            self.repr[neq[0]] = None;
        } else {
            let new_head = neq[0];
            self.repr[new_head] = None;
            for &m in &neq[1..] {
                self.repr[m] = Some(new_head);
            }
            self.classes.push(neq);
            if refine_new {
                let last = self.classes.len() - 1;
                splits += self.refine_class(last, true, oracle);
            }
        }
        splits
    }

    /// Drop constant-class members whose signature is no longer constant;
    /// survivors of the fall-out are regrouped into fresh classes.
    pub fn refine_const(&mut self, oracle: &impl RefineIF) -> usize {
        let mut keep = Vec::new();
        let mut gone = Vec::new();
        for &n in &self.class1 {
            if oracle.node_is_const(n) {
                keep.push(n);
            } else {
                gone.push(n);
            }
        }
        if gone.is_empty() {
            return 0;
        }
        self.refined = true;
        self.class1 = keep;
        let mut groups: Vec<Vec<NodeId>> = Vec::new();
        for n in gone {
            match groups
                .iter_mut()
                .find(|g| oracle.nodes_are_equal(g[0], n))
            {
                Some(g) => g.push(n),
                None => groups.push(vec![n]),
            }
        }
        let mut splits = 0;
        for g in groups {
            splits += 1;
            if g.len() < 2 {
                self.repr[g[0]] = None;
                continue;
            }
            for &m in &g[1..] {
                self.repr[m] = Some(g[0]);
            }
            self.classes.push(g);
        }
        splits
    }

    /// Number of equivalence relations currently asserted: one per
    /// follower, one per constant-class member.
    pub fn count_lits(&self) -> usize {
        self.classes.iter().map(|c| c.len() - 1).sum::<usize>() + self.class1.len()
    }

    /// Number of unordered candidate pairs, the speculative-reduction cost
    /// estimate.
    pub fn count_pairs(&self) -> usize {
        self.classes
            .iter()
            .map(|c| c.len() * (c.len() - 1) / 2)
            .sum::<usize>()
            + self.class1.len()
    }

    /// After proof, fix one permanent representative per class: the
    /// lowest-level member, ties broken by id, so the final reduction is
    /// deterministic and acyclic.
    pub fn select_repr(&mut self, aig: &Aig) {
        for class in &mut self.classes {
            let best = class
                .iter()
                .enumerate()
                .min_by_key(|&(_, &n)| (aig.level(n), n))
                .map(|(i, _)| i)
                .expect("empty class");
            class.swap(0, best);
            let head = class[0];
            self.repr[head] = None;
            for &m in &class[1..] {
                self.repr[m] = Some(head);
            }
        }
    }

    /// Export the final representative map, leaving nodes whose proof
    /// timed out self-representing.
    pub fn copy_reprs(&self, timeouts: &[NodeId]) -> Vec<Option<NodeId>> {
        let mut out = self.repr.clone();
        for &n in timeouts {
            out[n] = None;
        }
        #[cfg(feature = "boundary_check")]
        for (n, r) in out.iter().enumerate() {
            assert_ne!(Some(n), *r, "self-referential representative");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Table-driven oracle for exercising the splitting logic without a
    /// simulator: nodes are "equal" iff they carry the same tag.
    struct TagOracle {
        tags: Vec<u32>,
    }

    const CONST_TAG: u32 = !0;

    impl RefineIF for TagOracle {
        fn node_hash(&self, n: NodeId, table_size: usize) -> usize {
            (self.tags[n] as usize) % table_size
        }
        fn node_is_const(&self, n: NodeId) -> bool {
            self.tags[n] == CONST_TAG
        }
        fn nodes_are_equal(&self, a: NodeId, b: NodeId) -> bool {
            self.tags[a] == self.tags[b]
        }
    }

    fn aig_with_ands(n: usize) -> Aig {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        let mut prev = aig.and(a, b);
        for _ in 1..n {
            prev = aig.and(prev, a.flip()).flip();
        }
        aig
    }

    #[test]
    fn prepare_groups_by_tag() {
        let aig = aig_with_ands(4);
        // node ids 3..=6 are the AND gates
        let mut tags = vec![0; aig.num_nodes()];
        tags[3] = 7;
        tags[4] = 7;
        tags[5] = 9;
        tags[6] = CONST_TAG;
        let oracle = TagOracle { tags };
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, false, 0);
        assert_eq!(1, cla.num_classes());
        assert_eq!(vec![3, 4], cla.classes()[0]);
        assert_eq!(Some(3), cla.repr(4));
        assert_eq!(None, cla.repr(5));
        assert_eq!(vec![6], cla.const_class().to_vec());
        assert_eq!(Some(CONST1), cla.repr(6));
        assert_eq!(2, cla.count_lits());
    }

    #[test]
    fn refine_splits_stale_class() {
        let aig = aig_with_ands(4);
        let mut tags = vec![0; aig.num_nodes()];
        for n in 3..=6 {
            tags[n] = 5;
        }
        let mut oracle = TagOracle { tags };
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, false, 0);
        assert_eq!(1, cla.num_classes());
        assert_eq!(4, cla.classes()[0].len());
        // the oracle changes its mind about nodes 5 and 6
        oracle.tags[5] = 8;
        oracle.tags[6] = 8;
        assert!(cla.refine(&oracle) > 0);
        assert!(cla.refined());
        assert_eq!(2, cla.num_classes());
        assert_eq!(vec![3, 4], cla.classes()[0]);
        assert_eq!(vec![5, 6], cla.classes()[1]);
        assert_eq!(Some(5), cla.repr(6));
        assert_eq!(None, cla.repr(5));
    }

    #[test]
    fn refine_dissolves_singletons() {
        let aig = aig_with_ands(3);
        let mut tags = vec![0; aig.num_nodes()];
        for n in 3..=5 {
            tags[n] = 4;
        }
        let mut oracle = TagOracle { tags };
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, false, 0);
        // every member now disagrees with every other
        oracle.tags[4] = 1;
        oracle.tags[5] = 2;
        cla.refine(&oracle);
        assert_eq!(0, cla.num_classes());
        for n in 3..=5 {
            assert_eq!(None, cla.repr(n));
        }
    }

    #[test]
    fn const_class_fallout_regroups() {
        let aig = aig_with_ands(4);
        let mut tags = vec![0; aig.num_nodes()];
        for n in 3..=6 {
            tags[n] = CONST_TAG;
        }
        let mut oracle = TagOracle { tags };
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, false, 0);
        assert_eq!(4, cla.const_class().len());
        oracle.tags[5] = 3;
        oracle.tags[6] = 3;
        cla.refine_const(&oracle);
        assert_eq!(vec![3, 4], cla.const_class().to_vec());
        assert_eq!(1, cla.num_classes());
        assert_eq!(vec![5, 6], cla.classes()[0]);
    }

    #[test]
    fn select_repr_prefers_low_level() {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        let shallow = aig.and(a, b); // level 1
        let mid = aig.and(shallow, a); // level 2
        let deep = aig.and(mid, b); // level 3
        let mut tags = vec![0; aig.num_nodes()];
        tags[shallow.nid()] = 6;
        tags[mid.nid()] = 6;
        tags[deep.nid()] = 6;
        let oracle = TagOracle { tags };
        let mut cla = ClassDB::new(&aig);
        cla.prepare(&aig, &oracle, false, 0);
        // force a deeper head, then let selection fix it
        cla.classes[0].swap(0, 2);
        cla.select_repr(&aig);
        assert_eq!(shallow.nid(), cla.classes()[0][0]);
        assert_eq!(Some(shallow.nid()), cla.repr(deep.nid()));
        let reprs = cla.copy_reprs(&[deep.nid()]);
        assert_eq!(None, reprs[deep.nid()]);
        assert_eq!(Some(shallow.nid()), reprs[mid.nid()]);
    }
}
