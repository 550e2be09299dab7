/*!
# fraig: functional reduction of And-Inverter Graphs

A SAT-sweeping engine that discovers functionally equivalent signals in a
circuit and collapses each equivalence class onto a single representative.
Candidates come from bit-parallel random and targeted simulation; proofs
come from an incremental CDCL solver fed lazily clauseified logic cones.
Sequential circuits are handled by k-induction over unrolled timeframes
with speculative reduction.

## Usage

```
use fraig::{Aig, Config, fraig_perform};
use fraig::types::*;

// n1 = !(a & b), n2 = !a | !b through a different structure
let mut aig = Aig::new();
let a = aig.add_ci().edge(false);
let b = aig.add_ci().edge(false);
let n1 = aig.and(a, b).flip();
let p = aig.and(a, b.flip());
let q = aig.and(a.flip(), b);
let r = aig.or(p, q);
let z = aig.and(a.flip(), b.flip());
let n2 = aig.or(r, z);
aig.add_co(n1);
aig.add_co(n2);

let reduced = fraig_perform(&aig, &Config::default());
assert_eq!(reduced.aig.co_driver(0), reduced.aig.co_driver(1));
assert_eq!(1, reduced.aig.num_ands());
```

Sequential sweeping goes through [`fraig_induction`] with
[`Config::seq`]; register correspondence is the same call with
`latch_corr` set.
*/
/// The And-Inverter Graph package: nodes, structural hashing, phases.
pub mod aig;
/// The BMC prefix stage refining classes over initialized frames.
pub mod bmc;
/// Combinational equivalence checking by iterated fraiging.
pub mod cec;
/// Candidate equivalence classes and their refinement oracle.
pub mod classes;
/// CNF-on-demand clauseification of logic cones.
pub mod cnf;
/// Engine configuration.
pub mod config;
/// One-hotness conditions over register pairs.
pub mod hot;
/// The k-induction driver with speculative reduction.
pub mod ind;
/// The engine manager tying the pieces together.
pub mod man;
/// The SAT prover entry points.
pub mod sat;
/// The bit-parallel simulator.
pub mod sim;
/// The incremental CDCL solver.
pub mod solver;
/// Run statistics.
pub mod state;
/// The combinational sweep driver.
pub mod sweep;
/// Basic types: node ids, edges, literals, the proof trichotomy.
pub mod types;

#[macro_use]
extern crate bitflags;

pub use {
    aig::Aig,
    cec::{fraig_cec, fraig_sat, CecResult},
    config::Config,
    ind::fraig_induction,
    sweep::{fraig_perform, miter_status, FraigResult},
    types::{FraigError, MiterStatus, ProofStatus},
};
