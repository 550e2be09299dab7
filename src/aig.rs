//! And-Inverter Graph package: node allocation with structural hashing,
//! phases and levels, the sequential input/output conventions, MUX shape
//! recognition, and duplication under a representative map.
//!
//! Combinational inputs are ordered primary inputs first, register outputs
//! last; combinational outputs are primary outputs first, register inputs
//! last. Register input `i` feeds register output `i` in the next cycle.
use {
    crate::types::*,
    std::collections::HashMap,
};

/// What a node is. The constant-1 node exists exactly once, at id 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Const1,
    /// combinational input: primary input or register output
    Ci,
    /// combinational output: primary output or register input
    Co,
    And,
}

#[derive(Clone, Debug)]
pub struct AigNode {
    pub kind: NodeKind,
    /// first fanin (Co nodes use only this one)
    pub fanin0: Edge,
    pub fanin1: Edge,
    /// distance to the furthest combinational input
    pub level: u32,
    /// number of fanout references
    pub refs: u32,
    /// position in the Ci/Co list, when applicable
    pub cio_id: u32,
    /// value of the node under the all-zero input assignment
    pub phase: bool,
    pub flags: NodeFlag,
}

/// The graph manager. Nodes are id-ordered topologically: every AND gate
/// is created after both of its fanins.
#[derive(Clone, Debug)]
pub struct Aig {
    nodes: Vec<AigNode>,
    cis: Vec<NodeId>,
    cos: Vec<NodeId>,
    num_regs: usize,
    strash: HashMap<(Edge, Edge), NodeId>,
}

impl Aig {
    pub fn new() -> Aig {
        let mut aig = Aig {
            nodes: Vec::with_capacity(64),
            cis: Vec::new(),
            cos: Vec::new(),
            num_regs: 0,
            strash: HashMap::new(),
        };
        aig.nodes.push(AigNode {
            kind: NodeKind::Const1,
            fanin0: EDGE_TRUE,
            fanin1: EDGE_TRUE,
            level: 0,
            refs: 0,
            cio_id: 0,
            phase: true,
            flags: NodeFlag::empty(),
        });
        aig
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn num_cis(&self) -> usize {
        self.cis.len()
    }
    pub fn num_cos(&self) -> usize {
        self.cos.len()
    }
    pub fn num_regs(&self) -> usize {
        self.num_regs
    }
    pub fn num_pis(&self) -> usize {
        self.cis.len() - self.num_regs
    }
    pub fn num_pos(&self) -> usize {
        self.cos.len() - self.num_regs
    }
    pub fn num_ands(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind == NodeKind::And).count()
    }

    pub fn node(&self, n: NodeId) -> &AigNode {
        &self.nodes[n]
    }
    pub fn node_mut(&mut self, n: NodeId) -> &mut AigNode {
        &mut self.nodes[n]
    }
    pub fn kind(&self, n: NodeId) -> NodeKind {
        self.nodes[n].kind
    }
    pub fn is_and(&self, n: NodeId) -> bool {
        self.nodes[n].kind == NodeKind::And
    }
    pub fn is_ci(&self, n: NodeId) -> bool {
        self.nodes[n].kind == NodeKind::Ci
    }
    pub fn level(&self, n: NodeId) -> u32 {
        self.nodes[n].level
    }
    pub fn phase(&self, n: NodeId) -> bool {
        self.nodes[n].phase
    }
    /// phase of the function seen through an edge.
    pub fn edge_phase(&self, e: Edge) -> bool {
        self.nodes[e.nid()].phase ^ e.compl()
    }

    pub fn cis(&self) -> &[NodeId] {
        &self.cis
    }
    pub fn cos(&self) -> &[NodeId] {
        &self.cos
    }
    pub fn ci(&self, i: usize) -> NodeId {
        self.cis[i]
    }
    pub fn co(&self, i: usize) -> NodeId {
        self.cos[i]
    }
    pub fn pis(&self) -> &[NodeId] {
        &self.cis[..self.num_pis()]
    }
    pub fn latch_outs(&self) -> &[NodeId] {
        &self.cis[self.num_pis()..]
    }
    pub fn pos(&self) -> &[NodeId] {
        &self.cos[..self.num_pos()]
    }
    pub fn latch_ins(&self) -> &[NodeId] {
        &self.cos[self.num_pos()..]
    }
    pub fn co_driver(&self, i: usize) -> Edge {
        self.nodes[self.cos[i]].fanin0
    }

    /// Iterate AND node ids in topological (id) order.
    pub fn ands(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, nd)| nd.kind == NodeKind::And)
            .map(|(i, _)| i)
    }

    pub fn add_ci(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(AigNode {
            kind: NodeKind::Ci,
            fanin0: EDGE_TRUE,
            fanin1: EDGE_TRUE,
            level: 0,
            refs: 0,
            cio_id: self.cis.len() as u32,
            phase: false,
            flags: NodeFlag::empty(),
        });
        self.cis.push(id);
        id
    }

    pub fn add_co(&mut self, driver: Edge) -> NodeId {
        let id = self.nodes.len();
        let phase = self.edge_phase(driver);
        let level = self.nodes[driver.nid()].level;
        self.nodes[driver.nid()].refs += 1;
        self.nodes.push(AigNode {
            kind: NodeKind::Co,
            fanin0: driver,
            fanin1: EDGE_TRUE,
            level,
            refs: 0,
            cio_id: self.cos.len() as u32,
            phase,
            flags: NodeFlag::empty(),
        });
        self.cos.push(id);
        id
    }

    /// Declare the last `n` Ci/Co pairs to be registers.
    pub fn set_num_regs(&mut self, n: usize) {
        debug_assert!(n <= self.cis.len());
        self.num_regs = n;
    }

    /// Structurally hashed AND with constant folding.
    pub fn and(&mut self, a: Edge, b: Edge) -> Edge {
        if a == b {
            return a;
        }
        if a == b.flip() || a == EDGE_FALSE || b == EDGE_FALSE {
            return EDGE_FALSE;
        }
        if a == EDGE_TRUE {
            return b;
        }
        if b == EDGE_TRUE {
            return a;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&id) = self.strash.get(&key) {
            return id.edge(false);
        }
        let (f0, f1) = key;
        let id = self.nodes.len();
        let level = self.nodes[f0.nid()].level.max(self.nodes[f1.nid()].level) + 1;
        let phase = self.edge_phase(f0) && self.edge_phase(f1);
        self.nodes[f0.nid()].refs += 1;
        self.nodes[f1.nid()].refs += 1;
        self.nodes.push(AigNode {
            kind: NodeKind::And,
            fanin0: f0,
            fanin1: f1,
            level,
            refs: 0,
            cio_id: 0,
            phase,
            flags: NodeFlag::empty(),
        });
        self.strash.insert(key, id);
        id.edge(false)
    }

    pub fn or(&mut self, a: Edge, b: Edge) -> Edge {
        self.and(a.flip(), b.flip()).flip()
    }

    pub fn exor(&mut self, a: Edge, b: Edge) -> Edge {
        // a ^ b = (a & !b) | (!a & b)
        let t = self.and(a, b.flip());
        let e = self.and(a.flip(), b);
        self.or(t, e)
    }

    pub fn mux(&mut self, i: Edge, t: Edge, e: Edge) -> Edge {
        let hi = self.and(i, t);
        let lo = self.and(i.flip(), e);
        self.or(hi, lo)
    }

    pub fn fanin0(&self, n: NodeId) -> Edge {
        self.nodes[n].fanin0
    }
    pub fn fanin1(&self, n: NodeId) -> Edge {
        self.nodes[n].fanin1
    }

    /// Looks for the ITE shape rooted at an AND node: both fanin edges
    /// complemented, both fanins AND gates sharing one variable in
    /// opposite polarities.
    pub fn is_mux_type(&self, n: NodeId) -> bool {
        let nd = &self.nodes[n];
        if nd.kind != NodeKind::And {
            return false;
        }
        if !nd.fanin0.compl() || !nd.fanin1.compl() {
            return false;
        }
        let a = nd.fanin0.nid();
        let b = nd.fanin1.nid();
        if !self.is_and(a) || !self.is_and(b) {
            return false;
        }
        self.shared_control(a, b).is_some()
    }

    /// Extract `(i, t, e)` such that the node computes `ITE(i, t, e)`.
    /// Callers must have checked [`Aig::is_mux_type`].
    pub fn recognize_mux(&self, n: NodeId) -> (Edge, Edge, Edge) {
        let a = self.nodes[n].fanin0.nid();
        let b = self.nodes[n].fanin1.nid();
        let (sa, oa, sb, ob) = self.shared_control(a, b).expect("not a mux shape");
        // the fanin holding the positive occurrence contributes the branch
        // selected when the control is true
        if !sa.compl() {
            (sa, oa.flip(), ob.flip())
        } else {
            (sb, ob.flip(), oa.flip())
        }
    }

    /// The shared variable of two AND gates appearing in opposite
    /// polarities, with the sibling edge on each side.
    fn shared_control(&self, a: NodeId, b: NodeId) -> Option<(Edge, Edge, Edge, Edge)> {
        let (a0, a1) = (self.nodes[a].fanin0, self.nodes[a].fanin1);
        let (b0, b1) = (self.nodes[b].fanin0, self.nodes[b].fanin1);
        for &(sa, oa) in &[(a0, a1), (a1, a0)] {
            for &(sb, ob) in &[(b0, b1), (b1, b0)] {
                if sa.nid() == sb.nid() && sa.compl() != sb.compl() {
                    return Some((sa, oa, sb, ob));
                }
            }
        }
        None
    }

    /// Rebuild the graph with every reference routed through its target's
    /// representative (complemented as the phase bits dictate). Logic
    /// unreachable from the combinational outputs is dropped; inputs are
    /// all recreated, so merged register outputs simply lose their
    /// fanout.
    pub fn dup_with_reprs(&self, reprs: &[Option<NodeId>]) -> Aig {
        let mut new = Aig::new();
        let mut image: Vec<Option<Edge>> = vec![None; self.nodes.len()];
        image[CONST1] = Some(EDGE_TRUE);
        for &ci in &self.cis {
            let e = new.add_ci().edge(false);
            image[ci] = Some(e);
        }
        // representatives point one level deep; every reference resolves
        // to its target's image before the edge complement applies
        let target = |n: NodeId| -> NodeId {
            match reprs.get(n).copied().flatten() {
                Some(r) if r != n => {
                    debug_assert!(reprs[r].is_none() || reprs[r] == Some(r));
                    r
                }
                _ => n,
            }
        };
        let resolve = |image: &[Option<Edge>], e: Edge| -> Edge {
            let n = e.nid();
            let t = target(n);
            let mut img = image[t].expect("target image not built");
            if t != n {
                img = img.flip_cond(self.nodes[n].phase ^ self.nodes[t].phase);
            }
            img.flip_cond(e.compl())
        };
        let mut stack: Vec<(NodeId, bool)> = Vec::new();
        for i in 0..self.cos.len() {
            stack.push((target(self.co_driver(i).nid()), false));
            while let Some((n, expanded)) = stack.pop() {
                if image[n].is_some() {
                    continue;
                }
                debug_assert!(self.is_and(n));
                let f0 = self.nodes[n].fanin0;
                let f1 = self.nodes[n].fanin1;
                if expanded {
                    let i0 = resolve(&image, f0);
                    let i1 = resolve(&image, f1);
                    image[n] = Some(new.and(i0, i1));
                } else {
                    stack.push((n, true));
                    stack.push((target(f0.nid()), false));
                    stack.push((target(f1.nid()), false));
                }
            }
        }
        for i in 0..self.cos.len() {
            let img = resolve(&image, self.co_driver(i));
            new.add_co(img);
        }
        new.set_num_regs(self.num_regs);
        new
    }

    /// Reference evaluation of one combinational frame: register outputs
    /// are treated as free inputs. Returns the value of every node.
    pub fn eval_all(&self, ci_values: &[bool]) -> Vec<bool> {
        debug_assert_eq!(ci_values.len(), self.cis.len());
        let mut val = vec![false; self.nodes.len()];
        val[CONST1] = true;
        for (i, &ci) in self.cis.iter().enumerate() {
            val[ci] = ci_values[i];
        }
        for n in 0..self.nodes.len() {
            let nd = &self.nodes[n];
            match nd.kind {
                NodeKind::And => {
                    let v0 = val[nd.fanin0.nid()] ^ nd.fanin0.compl();
                    let v1 = val[nd.fanin1.nid()] ^ nd.fanin1.compl();
                    val[n] = v0 && v1;
                }
                NodeKind::Co => {
                    val[n] = val[nd.fanin0.nid()] ^ nd.fanin0.compl();
                }
                _ => {}
            }
        }
        val
    }

    /// Like [`Aig::eval_all`], reduced to one value per combinational
    /// output.
    pub fn eval_comb(&self, ci_values: &[bool]) -> Vec<bool> {
        let val = self.eval_all(ci_values);
        self.cos.iter().map(|&co| val[co]).collect()
    }

    /// Reference sequential evaluation from the all-zero initial state.
    /// `pi_seq[f]` holds the primary-input values of cycle `f`; the result
    /// holds the primary-output values of each cycle.
    pub fn eval_seq(&self, pi_seq: &[Vec<bool>]) -> Vec<Vec<bool>> {
        let mut regs = vec![false; self.num_regs];
        let mut out = Vec::with_capacity(pi_seq.len());
        for pis in pi_seq {
            debug_assert_eq!(pis.len(), self.num_pis());
            let mut cis = pis.clone();
            cis.extend_from_slice(&regs);
            let cos = self.eval_comb(&cis);
            out.push(cos[..self.num_pos()].to_vec());
            regs.copy_from_slice(&cos[self.num_pos()..]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_input() -> (Aig, Edge, Edge) {
        let mut aig = Aig::new();
        let a = aig.add_ci().edge(false);
        let b = aig.add_ci().edge(false);
        (aig, a, b)
    }

    #[test]
    fn and_folds_constants() {
        let (mut aig, a, _) = two_input();
        assert_eq!(a, aig.and(a, EDGE_TRUE));
        assert_eq!(EDGE_FALSE, aig.and(a, EDGE_FALSE));
        assert_eq!(EDGE_FALSE, aig.and(a, a.flip()));
        assert_eq!(a, aig.and(a, a));
    }

    #[test]
    fn and_is_hashed() {
        let (mut aig, a, b) = two_input();
        let x = aig.and(a, b);
        let y = aig.and(b, a);
        assert_eq!(x, y);
        assert_eq!(1, aig.num_ands());
    }

    #[test]
    fn phase_tracks_zero_input_value() {
        let (mut aig, a, b) = two_input();
        let nand = aig.and(a, b).flip();
        assert!(aig.edge_phase(nand));
        let n = aig.and(nand, a);
        assert!(!aig.phase(n.nid()));
    }

    #[test]
    fn mux_is_recognized() {
        let (mut aig, a, b) = two_input();
        let c = aig.add_ci().edge(false);
        let m = aig.mux(c, a, b);
        assert!(aig.is_mux_type(m.nid()));
        let (i, t, e) = aig.recognize_mux(m.nid());
        // the mux output is complemented relative to the top AND
        assert!(m.compl());
        // check the extracted ITE against all control/branch values
        let mut vals = vec![false; aig.num_nodes()];
        vals[CONST1] = true;
        for bits in 0..8u32 {
            for (k, &ci) in aig.cis().iter().enumerate() {
                vals[ci] = bits & (1 << k) != 0;
            }
            for n in aig.ands() {
                let nd = aig.node(n);
                vals[n] = (vals[nd.fanin0.nid()] ^ nd.fanin0.compl())
                    && (vals[nd.fanin1.nid()] ^ nd.fanin1.compl());
            }
            let ev = |e: Edge| vals[e.nid()] ^ e.compl();
            // the extracted ITE describes the regular top node, whose
            // function is the complement of the mux edge
            let want = if ev(i) { ev(t) } else { ev(e) };
            assert_eq!(want, ev(m.regular()));
        }
    }

    #[test]
    fn dup_with_reprs_merges() {
        let (mut aig, a, b) = two_input();
        let x = aig.and(a, b);
        let y = aig.and(a, b.flip());
        aig.add_co(x);
        aig.add_co(y);
        // pretend y's node is equivalent to x's (it is not; this only
        // exercises the plumbing)
        let mut reprs = vec![None; aig.num_nodes()];
        reprs[y.nid()] = Some(x.nid());
        let red = aig.dup_with_reprs(&reprs);
        assert_eq!(1, red.num_ands());
        assert_eq!(2, red.num_cos());
    }

    #[test]
    fn dup_keeps_functions_without_reprs() {
        let (mut aig, a, b) = two_input();
        let x = aig.and(a, b.flip());
        aig.add_co(x.flip());
        let reprs = vec![None; aig.num_nodes()];
        let red = aig.dup_with_reprs(&reprs);
        for bits in 0..4usize {
            let cis = vec![bits & 1 != 0, bits & 2 != 0];
            assert_eq!(aig.eval_comb(&cis), red.eval_comb(&cis));
        }
    }

    #[test]
    fn eval_seq_shift_register() {
        let mut aig = Aig::new();
        let pi = aig.add_ci().edge(false);
        let r0 = aig.add_ci().edge(false);
        let r1 = aig.add_ci().edge(false);
        aig.add_co(r1); // po observes the second register
        aig.add_co(pi); // r0 <- pi
        aig.add_co(r0); // r1 <- r0
        aig.set_num_regs(2);
        let seq = vec![vec![true], vec![false], vec![true], vec![false]];
        let out = aig.eval_seq(&seq);
        assert_eq!(
            vec![vec![false], vec![false], vec![true], vec![false]],
            out
        );
    }
}
