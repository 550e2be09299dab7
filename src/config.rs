//! Engine configuration. One immutable set of knobs per run; the two
//! constructors mirror the combinational and sequential default sets of
//! the underlying sweeping algorithm.

/// Parameters governing a sweep. Invariant across a call.
#[derive(Clone, Debug)]
pub struct Config {
    /// simulation words per frame (32 words = 1024 patterns per frame)
    pub sim_words: usize,
    /// class-shrink ratio below which random simulation is saturated
    pub sim_satur: f64,
    /// fraction of the cone depth whose variables get an activity bump
    pub act_cone_ratio: f64,
    /// largest activity bump handed to a cone variable
    pub act_cone_bump_max: f64,
    /// SAT conflict budget for one node-equivalence query (0 = unlimited)
    pub bt_limit_node: u64,
    /// SAT conflict budget for a constant/miter query (0 = unlimited)
    pub bt_limit_miter: u64,
    /// global conflict budget over the whole run (0 = off)
    pub bt_limit_global: u64,
    /// global propagation budget over the whole run (0 = off)
    pub ins_limit_global: u64,
    /// number of initialized prefix frames simulated before induction
    pub frames_pref: usize,
    /// induction depth k (number of unrolled step frames)
    pub frames_ind: usize,
    /// consider only nodes up to this level when forming classes (0 = all)
    pub max_levels: usize,
    /// substitute class representatives while unrolling timeframes
    pub speculate: bool,
    /// also prove candidates that simulate as a constant
    pub do_sparse: bool,
    /// bump solver activity of variables inside the query cone
    pub cone_bias: bool,
    /// restrict candidate classes to register outputs
    pub latch_corr: bool,
    /// derive one-hotness clauses over register pairs and carry them as
    /// extra hypothesis constraints (simple induction only)
    pub use_one_hot: bool,
    /// hook for an external rewriting pass over the speculative frames;
    /// the engine itself ships none and consumes the frames as built
    pub rewrite: bool,
    /// seed of the engine's pseudorandom pattern stream
    pub seed: u64,
}

impl Default for Config {
    /// Combinational defaults.
    fn default() -> Config {
        Config {
            sim_words: 32,
            sim_satur: 0.005,
            act_cone_ratio: 0.3,
            act_cone_bump_max: 10.0,
            bt_limit_node: 100,
            bt_limit_miter: 500_000,
            bt_limit_global: 0,
            ins_limit_global: 0,
            frames_pref: 0,
            frames_ind: 0,
            max_levels: 0,
            speculate: false,
            do_sparse: true,
            cone_bias: true,
            latch_corr: false,
            use_one_hot: false,
            rewrite: false,
            seed: 0xABC_ABC,
        }
    }
}

impl Config {
    /// Sequential defaults: one simulation word per frame, a much larger
    /// per-node conflict budget, speculation on, cone bias off.
    pub fn seq() -> Config {
        Config {
            sim_words: 1,
            bt_limit_node: 10_000_000,
            frames_pref: 0,
            frames_ind: 1,
            speculate: true,
            cone_bias: false,
            ..Config::default()
        }
    }
}
