//! Affine-invariant ensemble sampler (Goodman & Weare stretch move).
//!
//! The ensemble is split into two fixed halves. One iteration updates the
//! second half against a frozen snapshot of the first, then the first half
//! against the freshly updated second half. Within a half-pass every
//! proposal only reads the complementary half, so the log-densities of a
//! half-pass are evaluated in parallel (rayon) without synchronization.
//!
//! One recorded step is `step_granularity` such iterations; only the
//! positions after the last iteration of each group enter the chain.
//!
//! Determinism: all random numbers of a half-pass (partner, stretch factor,
//! acceptance uniform) are drawn sequentially from the sampler's seeded RNG
//! before any evaluation. Results are therefore identical for any thread
//! count and chains resume exactly where they stopped.

use log::{debug, info, trace, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::{Parameter, expand_free};
use crate::error::{FitError, FitResult};
use crate::fit::convergence::ConvergenceTest;
use crate::fit::posterior::LogPdf;

/// Full chain indexed as `[walker][step][parameter]`.
pub type Chain = Vec<Vec<Vec<f64>>>;

/// Attempts at redrawing an initial walker that lands at `-inf`.
const MAX_INIT_REDRAWS: usize = 100;

/// Minimum walker count used when none is configured.
const MIN_DEFAULT_WALKERS: usize = 16;

/// Sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Walker count; must be even and at least twice the free dimension.
    /// `None` uses `max(16, 4·D)` rounded up to even.
    pub walkers: Option<usize>,
    /// Stretch-move scale `a > 1`.
    pub stretch: f64,
    /// Upper bound on concurrent proposal evaluations. `None` uses the
    /// global rayon pool.
    pub threads: Option<usize>,
    /// Stretch-move iterations per recorded step.
    pub step_granularity: usize,
    /// Safety cap on recorded steps taken by one [`Sampler::samples`] call.
    pub max_steps: usize,
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            walkers: None,
            stretch: 2.0,
            threads: None,
            step_granularity: 10,
            max_steps: 10_000,
            seed: 0x5EED_F17,
        }
    }
}

impl SamplerConfig {
    pub fn walkers(self, n: usize) -> Self {
        Self {
            walkers: Some(n),
            ..self
        }
    }

    pub fn stretch(self, a: f64) -> Self {
        Self { stretch: a, ..self }
    }

    pub fn threads(self, n: usize) -> Self {
        Self {
            threads: Some(n),
            ..self
        }
    }

    pub fn step_granularity(self, n: usize) -> Self {
        Self {
            step_granularity: n,
            ..self
        }
    }

    pub fn max_steps(self, n: usize) -> Self {
        Self {
            max_steps: n,
            ..self
        }
    }

    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    fn resolve_walkers(&self, dims: usize) -> usize {
        self.walkers.unwrap_or_else(|| {
            let n = (4 * dims).max(MIN_DEFAULT_WALKERS);
            n + n % 2
        })
    }

    fn validate(&self, walkers: usize, dims: usize) -> FitResult<()> {
        if dims == 0 {
            return Err(FitError::invalid_config("no free parameters to sample"));
        }
        if walkers % 2 != 0 {
            return Err(FitError::invalid_config(format!(
                "walker count must be even, got {walkers}"
            )));
        }
        if walkers < 2 * dims {
            return Err(FitError::invalid_config(format!(
                "walker count {walkers} is below twice the {dims} free dimensions"
            )));
        }
        if !(self.stretch.is_finite() && self.stretch > 1.0) {
            return Err(FitError::invalid_config(format!(
                "stretch must be finite and > 1, got {}",
                self.stretch
            )));
        }
        if self.threads == Some(0) {
            return Err(FitError::invalid_config("thread count must be positive"));
        }
        if self.step_granularity == 0 {
            return Err(FitError::invalid_config("step granularity must be positive"));
        }
        if self.max_steps == 0 {
            return Err(FitError::invalid_config("max steps must be positive"));
        }
        Ok(())
    }
}

/// One stretch-move proposal, with its random draws already taken.
#[derive(Debug, Clone)]
struct Proposal {
    walker: usize,
    z: f64,
    point: Vec<f64>,
    log_u: f64,
}

/// Ensemble MCMC sampler over the free parameters of a log-posterior.
pub struct Sampler {
    pdf: LogPdf,
    params: Vec<Parameter>,
    config: SamplerConfig,
    dims: usize,
    rng: StdRng,
    pool: Option<ThreadPool>,
    positions: Vec<Vec<f64>>,
    log_probs: Vec<f64>,
    /// `[walker][step][free parameter]`
    history: Chain,
    accepted: u64,
    proposed: u64,
    best_log_prob: f64,
    best_position: Vec<f64>,
}

impl Sampler {
    /// Seeds each walker at `value + spread·N(0,1)` per free parameter.
    ///
    /// `params` describes every parameter the log-posterior's caller knows
    /// about; frozen ones are excluded from the sampled vector and
    /// re-inserted in every returned chain.
    pub fn new(pdf: LogPdf, params: &[Parameter], config: SamplerConfig) -> FitResult<Self> {
        let dims = params.iter().filter(|p| !p.is_frozen()).count();
        let walkers = config.resolve_walkers(dims);
        config.validate(walkers, dims)?;

        let pool = match config.threads {
            Some(n) if n > 1 => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| FitError::invalid_config(format!("thread pool: {e}")))?,
            ),
            _ => None,
        };

        debug!(
            "ensemble sampler: walkers={walkers}, dims={dims}, stretch={}, threads={:?}",
            config.stretch, config.threads
        );

        let mut sampler = Self {
            pdf,
            params: params.to_vec(),
            dims,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            pool,
            positions: Vec::with_capacity(walkers),
            log_probs: Vec::with_capacity(walkers),
            history: vec![Vec::new(); walkers],
            accepted: 0,
            proposed: 0,
            best_log_prob: f64::NEG_INFINITY,
            best_position: Vec::new(),
        };
        sampler.initialize(walkers)?;
        Ok(sampler)
    }

    fn initialize(&mut self, walkers: usize) -> FitResult<()> {
        let free: Vec<(f64, f64)> = self
            .params
            .iter()
            .filter(|p| !p.is_frozen())
            .map(|p| (p.value(), p.spread()))
            .collect();

        let mut redraws = 0usize;
        for _ in 0..walkers {
            let mut position = Vec::new();
            let mut log_prob = f64::NEG_INFINITY;
            for attempt in 0..=MAX_INIT_REDRAWS {
                position = free
                    .iter()
                    .map(|&(value, spread)| {
                        let n: f64 = self.rng.sample(StandardNormal);
                        value + spread * n
                    })
                    .collect();
                log_prob = self.pdf.evaluate(&position);
                if log_prob > f64::NEG_INFINITY {
                    break;
                }
                if attempt < MAX_INIT_REDRAWS {
                    redraws += 1;
                }
            }
            self.track_best(log_prob, &position);
            self.positions.push(position);
            self.log_probs.push(log_prob);
        }

        if redraws > 0 {
            debug!("redrew {redraws} initial walker positions with zero posterior probability");
        }
        if self.log_probs.iter().all(|lp| *lp == f64::NEG_INFINITY) {
            return Err(FitError::Degenerate { walkers });
        }
        Ok(())
    }

    pub fn walkers(&self) -> usize {
        self.positions.len()
    }

    /// Number of sampled (non-frozen) parameters.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Recorded steps since construction.
    pub fn steps_taken(&self) -> usize {
        self.history.first().map_or(0, Vec::len)
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Record exactly `steps` more steps (`steps · step_granularity`
    /// iterations) and return the whole accumulated chain.
    pub fn raw_samples(&mut self, steps: usize) -> FitResult<Chain> {
        if steps == 0 {
            return Err(FitError::InvalidSteps);
        }
        for _ in 0..steps {
            self.step();
        }
        Ok(self.chain())
    }

    /// Record one step at a time, checking the tests after each, until every
    /// test passes on the same check. An empty slice applies
    /// [`ConvergenceTest::default`].
    pub fn samples(&mut self, tests: &[ConvergenceTest]) -> FitResult<Chain> {
        let test = match tests {
            [] => ConvergenceTest::default(),
            [single] => single.clone(),
            many => ConvergenceTest::All(many.to_vec()),
        };

        let cap = self.config.max_steps;
        let mut taken = 0usize;
        while taken < cap {
            self.step();
            taken += 1;

            let passed = test.is_satisfied(&self.history);
            trace!(
                "convergence check after {} steps: passed={passed}",
                self.steps_taken()
            );
            if passed {
                info!(
                    "sampler converged after {} steps (acceptance {:.3})",
                    self.steps_taken(),
                    self.acceptance_ratio()
                );
                return Ok(self.chain());
            }
        }

        warn!("sampler hit its cap of {cap} steps without converging");
        Err(FitError::NotConverged { steps: taken })
    }

    /// Accepted proposals over total proposals since construction.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.proposed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposed as f64
    }

    /// Full parameter vector with the highest log-probability seen so far.
    pub fn most_likely_parameters(&self) -> Vec<f64> {
        expand_free(&self.params, &self.best_position)
    }

    /// The accumulated chain with frozen parameters re-inserted.
    pub fn chain(&self) -> Chain {
        self.history
            .iter()
            .map(|steps| {
                steps
                    .iter()
                    .map(|free| expand_free(&self.params, free))
                    .collect()
            })
            .collect()
    }

    /// The accumulated chain over the free parameters only.
    pub fn free_chain(&self) -> &Chain {
        &self.history
    }

    fn step(&mut self) {
        for _ in 0..self.config.step_granularity {
            self.iterate();
        }
        for (k, position) in self.positions.iter().enumerate() {
            self.history[k].push(position.clone());
        }
    }

    fn iterate(&mut self) {
        let half = self.positions.len() / 2;
        let n = self.positions.len();
        self.half_pass(half..n, 0..half);
        self.half_pass(0..half, half..n);
    }

    fn half_pass(&mut self, active: std::ops::Range<usize>, complement: std::ops::Range<usize>) {
        let proposals = self.draw_proposals(active, complement);
        let log_probs = self.evaluate(&proposals);

        let exponent = (self.dims as f64) - 1.0;
        for (proposal, new_lp) in proposals.into_iter().zip(log_probs) {
            let k = proposal.walker;
            let old_lp = self.log_probs[k];
            let accept = if new_lp == f64::NEG_INFINITY {
                false
            } else if old_lp == f64::NEG_INFINITY {
                true
            } else {
                let log_ratio = exponent * proposal.z.ln() + new_lp - old_lp;
                proposal.log_u < log_ratio
            };

            self.proposed += 1;
            if accept {
                self.accepted += 1;
                self.track_best(new_lp, &proposal.point);
                self.positions[k] = proposal.point;
                self.log_probs[k] = new_lp;
            }
        }
    }

    fn draw_proposals(
        &mut self,
        active: std::ops::Range<usize>,
        complement: std::ops::Range<usize>,
    ) -> Vec<Proposal> {
        let a = self.config.stretch;
        active
            .map(|k| {
                let j = self.rng.gen_range(complement.clone());
                // Inverse CDF of g(z) ∝ 1/√z on [1/a, a].
                let u: f64 = self.rng.gen_range(0.0..1.0);
                let z = ((a - 1.0) * u + 1.0).powi(2) / a;
                let log_u = self.rng.gen_range(0.0f64..1.0).ln();

                let xk = &self.positions[k];
                let xj = &self.positions[j];
                let point = xj
                    .iter()
                    .zip(xk.iter())
                    .map(|(xj, xk)| xj + z * (xk - xj))
                    .collect();
                Proposal {
                    walker: k,
                    z,
                    point,
                    log_u,
                }
            })
            .collect()
    }

    fn evaluate(&self, proposals: &[Proposal]) -> Vec<f64> {
        let pdf = &self.pdf;
        if self.config.threads == Some(1) {
            return proposals.iter().map(|p| pdf.evaluate(&p.point)).collect();
        }
        let eval = || -> Vec<f64> {
            proposals
                .par_iter()
                .map(|p| pdf.evaluate(&p.point))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(eval),
            None => eval(),
        }
    }

    fn track_best(&mut self, log_prob: f64, position: &[f64]) {
        if log_prob > self.best_log_prob {
            self.best_log_prob = log_prob;
            self.best_position = position.to_vec();
        }
    }
}
