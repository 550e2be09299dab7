//! Run statistics: per-event counters plus the before/after sizes a caller
//! needs to judge the reduction. The engine never prints; callers format
//! the record through `Display` if they want the one-line report.
use std::fmt;
use std::ops::{Index, IndexMut};

/// stat index
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stat {
    SimRounds = 0,    // the number of simulation rounds
    Refinements,      // the number of class splits
    SatCalls,         // the number of prover queries
    SatCallsSat,      // queries refuted with a counter-example
    SatCallsUnsat,    // one-directional unsat results
    SatProofs,        // completed equivalence proofs
    SatFails,         // queries skipped or shrunk due to earlier failures
    SatFailsReal,     // queries that ran out of conflict budget
    Speculations,     // representative substitutions while unrolling
    EndOfStatIndex,   // Don't use this dummy.
}

#[derive(Clone, Debug)]
pub struct Stats {
    vals: Vec<u64>,
    pub lits_beg: usize,
    pub lits_end: usize,
    pub nodes_beg: usize,
    pub nodes_end: usize,
    pub regs_beg: usize,
    pub regs_end: usize,
    /// induction iterations until the fixed point
    pub iters: usize,
    /// one-hotness clauses alive at the fixed point
    pub one_hots: usize,
    /// asserted relations (literals plus one-hot clauses) after the
    /// prefix stage and after each induction iteration; the sequence is
    /// weakly decreasing
    pub progress: Vec<usize>,
    /// a global conflict/propagation budget cut the run short
    pub saturated: bool,
}

impl Default for Stats {
    fn default() -> Stats {
        Stats {
            vals: vec![0; Stat::EndOfStatIndex as usize],
            lits_beg: 0,
            lits_end: 0,
            nodes_beg: 0,
            nodes_end: 0,
            regs_beg: 0,
            regs_end: 0,
            iters: 0,
            one_hots: 0,
            progress: Vec::new(),
            saturated: false,
        }
    }
}

impl Index<Stat> for Stats {
    type Output = u64;
    fn index(&self, s: Stat) -> &u64 {
        &self.vals[s as usize]
    }
}

impl IndexMut<Stat> for Stats {
    fn index_mut(&mut self, s: Stat) -> &mut u64 {
        &mut self.vals[s as usize]
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Lit: {:>6} -> {:>6}, Node: {:>6} -> {:>6}, Reg: {:>4} -> {:>4} | \
             proof: {:>5}, cex: {:>5}, fail: {:>4}, it: {:>2}",
            self.lits_beg,
            self.lits_end,
            self.nodes_beg,
            self.nodes_end,
            self.regs_beg,
            self.regs_end,
            self[Stat::SatProofs],
            self[Stat::SatCallsSat],
            self[Stat::SatFailsReal],
            self.iters,
        )?;
        if self.one_hots > 0 {
            write!(f, ", 1h: {:>3}", self.one_hots)?;
        }
        if self.saturated {
            write!(f, " (saturated)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_index_independently() {
        let mut st = Stats::default();
        st[Stat::SatCalls] += 3;
        st[Stat::SatProofs] += 1;
        assert_eq!(3, st[Stat::SatCalls]);
        assert_eq!(1, st[Stat::SatProofs]);
        assert_eq!(0, st[Stat::SatCallsSat]);
        let line = format!("{}", st);
        assert!(line.contains("proof:"));
    }
}
