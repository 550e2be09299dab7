//! An incremental CDCL solver: watched literals, first-UIP learning,
//! activity-ordered decisions with saved phases, geometric restarts, and
//! per-call conflict/propagation budgets. The engine talks to it only
//! through [`SatSolverIF`], so a different backend can be dropped in.
use crate::types::*;

/// What the equivalence prover requires of a solver backend.
pub trait SatSolverIF {
    fn num_vars(&self) -> usize;
    /// grow the variable table to `n` variables.
    fn ensure_vars(&mut self, n: usize);
    /// add a clause at the root level; `false` iff the database became
    /// inconsistent.
    fn add_clause(&mut self, lits: &[Lit]) -> bool;
    /// solve under assumptions with a conflict and a propagation budget
    /// (0 = unlimited); returns [`LTRUE`], [`LFALSE`] or [`BOTTOM`].
    fn solve(&mut self, assumptions: &[Lit], conf_budget: u64, prop_budget: u64) -> Lbool;
    /// the value of a variable in the last [`LTRUE`] model.
    fn var_value(&self, v: Var) -> bool;
    /// raise a variable's decision priority.
    fn bump_activity(&mut self, v: Var, amount: f64);
    /// propagate root-level facts; `false` iff inconsistent.
    fn simplify(&mut self) -> bool;
    fn num_conflicts(&self) -> u64;
    fn num_propagations(&self) -> u64;
}

type ClauseId = usize;
const NULL_CLAUSE: ClauseId = 0;

const VAR_DECAY: f64 = 0.95;
const RESCALE_LIMIT: f64 = 1e100;
const RESCALE_FACTOR: f64 = 1e-100;
const RESTART_FIRST: u64 = 100;

#[derive(Debug)]
struct Clause {
    lits: Vec<Lit>,
}

/// 'Watch literal' structure
#[derive(Clone, Debug)]
struct Watch {
    /// a cache of a literal in the clause
    blocker: Lit,
    c: ClauseId,
}

/// Binary max-heap over variable activities backing decision selection.
#[derive(Debug, Default)]
struct VarHeap {
    heap: Vec<Var>,
    /// position + 1; 0 means absent
    pos: Vec<usize>,
}

impl VarHeap {
    fn grow(&mut self, n: usize) {
        while self.pos.len() < n {
            self.pos.push(0);
        }
    }
    fn contains(&self, v: Var) -> bool {
        self.pos[v] != 0
    }
    fn insert(&mut self, v: Var, act: &[f64]) {
        if self.contains(v) {
            return;
        }
        self.heap.push(v);
        self.pos[v] = self.heap.len();
        self.sift_up(self.heap.len() - 1, act);
    }
    fn update(&mut self, v: Var, act: &[f64]) {
        if self.contains(v) {
            self.sift_up(self.pos[v] - 1, act);
        }
    }
    fn pop(&mut self, act: &[f64]) -> Option<Var> {
        let top = *self.heap.first()?;
        let last = self.heap.pop().expect("heap underflow");
        self.pos[top] = 0;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.pos[last] = 1;
            self.sift_down(0, act);
        }
        Some(top)
    }
    fn sift_up(&mut self, mut i: usize, act: &[f64]) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if act[self.heap[parent]] >= act[self.heap[i]] {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }
    fn sift_down(&mut self, mut i: usize, act: &[f64]) {
        loop {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let mut best = i;
            if l < self.heap.len() && act[self.heap[l]] > act[self.heap[best]] {
                best = l;
            }
            if r < self.heap.len() && act[self.heap[r]] > act[self.heap[best]] {
                best = r;
            }
            if best == i {
                return;
            }
            self.swap(i, best);
            i = best;
        }
    }
    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i]] = i + 1;
        self.pos[self.heap[j]] = j + 1;
    }
}

fn lit_val(assign: &[Lbool], l: Lit) -> Lbool {
    match assign[l.var()] {
        BOTTOM => BOTTOM,
        a => a ^ (l as Lbool & 1),
    }
}

/// The solver state. Clause 0 is a dummy so that 0 can mean "no reason".
#[derive(Debug)]
pub struct Solver {
    clauses: Vec<Clause>,
    /// watcher lists indexed by literal; a clause sits in the lists of its
    /// first two literals and is visited when one of them becomes false
    watches: Vec<Vec<Watch>>,
    assign: Vec<Lbool>,
    level: Vec<u32>,
    reason: Vec<ClauseId>,
    /// saved phase of the last assignment
    polarity: Vec<bool>,
    activity: Vec<f64>,
    var_inc: f64,
    order: VarHeap,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    q_head: usize,
    seen: Vec<bool>,
    model: Vec<Lbool>,
    ok: bool,
    conflicts: u64,
    propagations: u64,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver {
            clauses: vec![Clause { lits: Vec::new() }],
            watches: Vec::new(),
            assign: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            polarity: Vec::new(),
            activity: Vec::new(),
            var_inc: 1.0,
            order: VarHeap::default(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            q_head: 0,
            seen: Vec::new(),
            model: Vec::new(),
            ok: true,
            conflicts: 0,
            propagations: 0,
        }
    }
}

impl Solver {
    pub fn new() -> Solver {
        Solver::default()
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn lit_value(&self, l: Lit) -> Lbool {
        lit_val(&self.assign, l)
    }

    fn assign_lit(&mut self, l: Lit, reason: ClauseId) {
        let v = l.var();
        debug_assert_eq!(BOTTOM, self.assign[v]);
        self.assign[v] = l.positive() as Lbool;
        self.level[v] = self.decision_level() as u32;
        self.reason[v] = reason;
        self.polarity[v] = l.positive();
        self.trail.push(l);
    }

    fn attach_clause(&mut self, lits: Vec<Lit>) -> ClauseId {
        debug_assert!(1 < lits.len());
        let cid = self.clauses.len();
        self.watches[lits[0] as usize].push(Watch {
            blocker: lits[1],
            c: cid,
        });
        self.watches[lits[1] as usize].push(Watch {
            blocker: lits[0],
            c: cid,
        });
        self.clauses.push(Clause { lits });
        cid
    }

    fn propagate(&mut self) -> ClauseId {
        while self.q_head < self.trail.len() {
            let p = self.trail[self.q_head];
            self.q_head += 1;
            self.propagations += 1;
            let false_lit = p.negate();
            let mut ws = std::mem::take(&mut self.watches[false_lit as usize]);
            let mut i = 0;
            'watches: while i < ws.len() {
                let blocker = ws[i].blocker;
                if self.lit_value(blocker) == LTRUE {
                    i += 1;
                    continue;
                }
                let cid = ws[i].c;
                let first;
                let mut new_watch = None;
                {
                    let Solver {
                        ref mut clauses,
                        ref assign,
                        ..
                    } = *self;
                    let c = &mut clauses[cid];
                    if c.lits[0] == false_lit {
                        c.lits.swap(0, 1);
                    }
                    debug_assert_eq!(false_lit, c.lits[1]);
                    first = c.lits[0];
                    if first != blocker && lit_val(assign, first) == LTRUE {
                        ws[i].blocker = first;
                        i += 1;
                        continue 'watches;
                    }
                    for k in 2..c.lits.len() {
                        if lit_val(assign, c.lits[k]) != LFALSE {
                            c.lits.swap(1, k);
                            new_watch = Some(c.lits[1]);
                            break;
                        }
                    }
                }
                if let Some(w) = new_watch {
                    self.watches[w as usize].push(Watch { blocker: first, c: cid });
                    ws.swap_remove(i);
                    continue 'watches;
                }
                // unit or conflicting
                ws[i].blocker = first;
                if self.lit_value(first) == LFALSE {
                    self.watches[false_lit as usize] = ws;
                    self.q_head = self.trail.len();
                    return cid;
                }
                self.assign_lit(first, cid);
                i += 1;
            }
            self.watches[false_lit as usize] = ws;
        }
        NULL_CLAUSE
    }

    /// First-UIP conflict analysis. Returns the learnt clause (asserting
    /// literal first) and the backjump level.
    fn analyze(&mut self, mut confl: ClauseId) -> (Vec<Lit>, usize) {
        let current = self.decision_level() as u32;
        // slot 0 is filled with the asserting literal at the end
        let mut learnt: Vec<Lit> = vec![0];
        let mut counter = 0usize;
        let mut index = self.trail.len();
        let mut first_round = true;
        let mut to_bump = Vec::new();
        let p;
        loop {
            debug_assert_ne!(NULL_CLAUSE, confl);
            let start = if first_round { 0 } else { 1 };
            for k in start..self.clauses[confl].lits.len() {
                let q = self.clauses[confl].lits[k];
                let v = q.var();
                if !self.seen[v] && self.level[v] > 0 {
                    self.seen[v] = true;
                    to_bump.push(v);
                    if self.level[v] >= current {
                        counter += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }
            first_round = false;
            loop {
                index -= 1;
                if self.seen[self.trail[index].var()] {
                    break;
                }
            }
            let q = self.trail[index];
            let v = q.var();
            self.seen[v] = false;
            counter -= 1;
            if counter == 0 {
                p = q;
                break;
            }
            confl = self.reason[v];
        }
        learnt[0] = p.negate();
        for &l in &learnt[1..] {
            self.seen[l.var()] = false;
        }
        for v in to_bump {
            self.bump_activity(v, self.var_inc);
        }
        self.var_inc /= VAR_DECAY;
        let bt = if learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for i in 2..learnt.len() {
                if self.level[learnt[i].var()] > self.level[learnt[max_i].var()] {
                    max_i = i;
                }
            }
            learnt.swap(1, max_i);
            self.level[learnt[1].var()] as usize
        };
        (learnt, bt)
    }

    fn cancel_until(&mut self, lv: usize) {
        if self.decision_level() <= lv {
            return;
        }
        let lim = self.trail_lim[lv];
        for i in lim..self.trail.len() {
            let v = self.trail[i].var();
            self.assign[v] = BOTTOM;
            self.order.insert(v, &self.activity);
        }
        self.trail.truncate(lim);
        self.trail_lim.truncate(lv);
        self.q_head = lim;
    }

    fn pick_branch_var(&mut self) -> Option<Var> {
        while let Some(v) = self.order.pop(&self.activity) {
            if self.assign[v] == BOTTOM {
                return Some(v);
            }
        }
        None
    }
}

impl SatSolverIF for Solver {
    fn num_vars(&self) -> usize {
        self.assign.len()
    }

    fn ensure_vars(&mut self, n: usize) {
        while self.assign.len() < n {
            let v = self.assign.len();
            self.assign.push(BOTTOM);
            self.level.push(0);
            self.reason.push(NULL_CLAUSE);
            self.polarity.push(false);
            self.activity.push(0.0);
            self.seen.push(false);
            self.model.push(BOTTOM);
            self.watches.push(Vec::new());
            self.watches.push(Vec::new());
            self.order.grow(v + 1);
            self.order.insert(v, &self.activity);
        }
    }

    fn add_clause(&mut self, lits: &[Lit]) -> bool {
        debug_assert!(self.trail_lim.is_empty());
        if !self.ok {
            return false;
        }
        let mut v = lits.to_vec();
        v.sort_unstable();
        let mut out: Vec<Lit> = Vec::with_capacity(v.len());
        let mut last: Option<Lit> = None;
        for l in v {
            debug_assert!(l.var() < self.num_vars());
            match self.lit_value(l) {
                LTRUE => return true,
                LFALSE => continue,
                _ => {
                    if Some(l) == last {
                        continue;
                    }
                    if Some(l.negate()) == last {
                        return true; // tautology
                    }
                    out.push(l);
                    last = Some(l);
                }
            }
        }
        match out.len() {
            0 => {
                self.ok = false;
                false
            }
            1 => {
                self.assign_lit(out[0], NULL_CLAUSE);
                if self.propagate() != NULL_CLAUSE {
                    self.ok = false;
                }
                self.ok
            }
            _ => {
                self.attach_clause(out);
                true
            }
        }
    }

    fn solve(&mut self, assumptions: &[Lit], conf_budget: u64, prop_budget: u64) -> Lbool {
        if !self.ok {
            return LFALSE;
        }
        debug_assert!(self.trail_lim.is_empty());
        let prop_start = self.propagations;
        let mut conf_count = 0u64;
        let mut next_restart = RESTART_FIRST;
        loop {
            let confl = self.propagate();
            if confl != NULL_CLAUSE {
                self.conflicts += 1;
                conf_count += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    return LFALSE;
                }
                let (learnt, bt) = self.analyze(confl);
                self.cancel_until(bt);
                if learnt.len() == 1 {
                    self.assign_lit(learnt[0], NULL_CLAUSE);
                } else {
                    let asserting = learnt[0];
                    let cid = self.attach_clause(learnt);
                    self.assign_lit(asserting, cid);
                }
                if conf_budget > 0 && conf_budget <= conf_count {
                    self.cancel_until(0);
                    return BOTTOM;
                }
                if prop_budget > 0 && prop_budget <= self.propagations - prop_start {
                    self.cancel_until(0);
                    return BOTTOM;
                }
                if next_restart <= conf_count {
                    next_restart *= 2;
                    self.cancel_until(0);
                }
                continue;
            }
            if self.decision_level() < assumptions.len() {
                let p = assumptions[self.decision_level()];
                match self.lit_value(p) {
                    LTRUE => self.trail_lim.push(self.trail.len()),
                    LFALSE => {
                        self.cancel_until(0);
                        return LFALSE;
                    }
                    _ => {
                        self.trail_lim.push(self.trail.len());
                        self.assign_lit(p, NULL_CLAUSE);
                    }
                }
                continue;
            }
            match self.pick_branch_var() {
                None => {
                    self.model.copy_from_slice(&self.assign);
                    self.cancel_until(0);
                    return LTRUE;
                }
                Some(v) => {
                    let l = var_lit(v, !self.polarity[v]);
                    self.trail_lim.push(self.trail.len());
                    self.assign_lit(l, NULL_CLAUSE);
                }
            }
        }
    }

    fn var_value(&self, v: Var) -> bool {
        self.model[v] == LTRUE
    }

    fn bump_activity(&mut self, v: Var, amount: f64) {
        self.activity[v] += amount;
        if RESCALE_LIMIT < self.activity[v] {
            for a in &mut self.activity {
                *a *= RESCALE_FACTOR;
            }
            self.var_inc *= RESCALE_FACTOR;
        }
        self.order.update(v, &self.activity);
    }

    fn simplify(&mut self) -> bool {
        debug_assert!(self.trail_lim.is_empty());
        if self.ok && self.propagate() != NULL_CLAUSE {
            self.ok = false;
        }
        self.ok
    }

    fn num_conflicts(&self) -> u64 {
        self.conflicts
    }
    fn num_propagations(&self) -> u64 {
        self.propagations
    }
}
