//! Multi-run experiment harness producing labelled QBER records.
//!
//! Each run transmits `qubits_per_run` qubits through a channel whose attack
//! intensity comes from the [`AttackSchedule`], sifts, estimates the QBER and
//! hands one [`ExperimentRecord`] to the [`Recorder`], in run order.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bb84::{generate_qubit, measure_qubit, Measurement};
use crate::bb84_states::Qubit;
use crate::channel::Channel;
use crate::error::{validate_prob, validate_range, Bb84Error, Result};
use crate::qber::estimate_qber;
use crate::random::RandomSource;
use crate::recorder::Recorder;
use crate::sifting::sift_measurements;

/// How attack intensity is chosen for run `index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackSchedule {
    /// No eavesdropper on any run.
    Never,
    /// Same intensity on every run.
    Constant(f64),
    /// Odd runs draw uniformly from `[low, high)`, even runs are clean.
    Alternating { low: f64, high: f64 },
    /// Each run is attacked with `probability`, intensity uniform in `[low, high)`.
    Random { probability: f64, low: f64, high: f64 },
}

impl AttackSchedule {
    pub fn validate(&self) -> Result<()> {
        match *self {
            AttackSchedule::Never => Ok(()),
            AttackSchedule::Constant(p) => validate_prob("attack intensity", p),
            AttackSchedule::Alternating { low, high } => validate_range(low, high),
            AttackSchedule::Random {
                probability,
                low,
                high,
            } => {
                validate_prob("attack probability", probability)?;
                validate_range(low, high)
            }
        }
    }

    /// Intensity for run `index`. Consumes one real per attacked run, plus one
    /// for the attack decision under [`AttackSchedule::Random`].
    pub fn intensity_for<S: RandomSource + ?Sized>(&self, index: usize, rng: &mut S) -> f64 {
        match *self {
            AttackSchedule::Never => 0.0,
            AttackSchedule::Constant(p) => p,
            AttackSchedule::Alternating { low, high } => {
                if index % 2 == 1 {
                    uniform_in(low, high, rng)
                } else {
                    0.0
                }
            }
            AttackSchedule::Random {
                probability,
                low,
                high,
            } => {
                if rng.uniform_real() < probability {
                    uniform_in(low, high, rng)
                } else {
                    0.0
                }
            }
        }
    }
}

fn uniform_in<S: RandomSource + ?Sized>(low: f64, high: f64, rng: &mut S) -> f64 {
    low + (high - low) * rng.uniform_real()
}

/// One labelled dataset row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub qber: f64,
    pub attack_present: bool,
}

/// Everything observed during a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub index: usize,
    pub attack_intensity: f64,
    pub qubits_sent: usize,
    pub intercepted: usize,
    /// Zero means the QBER in `record` carries no information.
    pub sifted_len: usize,
    pub errors: usize,
    pub record: ExperimentRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub num_runs: usize,
    pub qubits_per_run: usize,
    pub natural_noise: f64,
    pub schedule: AttackSchedule,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_runs: 1000,
            qubits_per_run: 10_000,
            natural_noise: 0.01,
            schedule: AttackSchedule::Alternating {
                low: 0.01,
                high: 0.15,
            },
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.qubits_per_run == 0 {
            return Err(Bb84Error::InvalidConfig(
                "qubits_per_run must be positive".to_string(),
            ));
        }
        validate_prob("natural noise", self.natural_noise)?;
        self.schedule.validate()
    }
}

/// Aggregate statistics over a finished experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub runs: usize,
    pub attacked_runs: usize,
    pub empty_runs: usize,
    pub mean_qber_clean: f64,
    pub mean_qber_attacked: f64,
    #[serde(skip)]
    sum_clean: f64,
    #[serde(skip)]
    sum_attacked: f64,
}

impl ExperimentSummary {
    pub fn push(&mut self, outcome: &RunOutcome) {
        self.runs += 1;
        if outcome.sifted_len == 0 {
            self.empty_runs += 1;
        }
        if outcome.record.attack_present {
            self.attacked_runs += 1;
            self.sum_attacked += outcome.record.qber;
            self.mean_qber_attacked = self.sum_attacked / self.attacked_runs as f64;
        } else {
            self.sum_clean += outcome.record.qber;
            self.mean_qber_clean = self.sum_clean / (self.runs - self.attacked_runs) as f64;
        }
    }

    pub fn clean_runs(&self) -> usize {
        self.runs - self.attacked_runs
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    config: ExperimentConfig,
}

impl ExperimentRunner {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Performs run `index`: generate and transmit every qubit, then measure
    /// every transmitted qubit, then sift and estimate.
    pub fn run_once<S: RandomSource + ?Sized>(&self, index: usize, rng: &mut S) -> Result<RunOutcome> {
        let n = self.config.qubits_per_run;
        let attack_intensity = self.config.schedule.intensity_for(index, rng);
        let channel = Channel::new(self.config.natural_noise, attack_intensity)?;

        let mut sent: Vec<Qubit> = Vec::with_capacity(n);
        let mut transmitted: Vec<Qubit> = Vec::with_capacity(n);
        let mut intercepted = 0;
        for _ in 0..n {
            let qubit = generate_qubit(rng);
            let t = channel.transmit_traced(qubit, rng);
            if t.intercepted {
                intercepted += 1;
            }
            sent.push(qubit);
            transmitted.push(t.qubit);
        }

        let measurements: Vec<Measurement> = transmitted
            .iter()
            .map(|&q| measure_qubit(q, rng))
            .collect();

        let key = sift_measurements(&sent, &measurements)?;
        let qber = estimate_qber(&key);
        if key.is_empty() {
            warn!("run {}: sifted key is empty, reporting QBER 0.0", index);
        }

        let record = ExperimentRecord {
            qber,
            attack_present: attack_intensity > 0.0,
        };
        debug!(
            "run {}: intensity={:.4} intercepted={} sifted={} qber={:.4}",
            index,
            attack_intensity,
            intercepted,
            key.len(),
            qber
        );

        Ok(RunOutcome {
            index,
            attack_intensity,
            qubits_sent: n,
            intercepted,
            sifted_len: key.len(),
            errors: key.errors(),
            record,
        })
    }

    /// Lazily yields runs `0..num_runs` in order.
    pub fn iter<'a, S: RandomSource + ?Sized>(&'a self, rng: &'a mut S) -> Runs<'a, S> {
        Runs {
            runner: self,
            rng,
            next: 0,
        }
    }

    /// Runs the whole experiment, recording each run exactly once, in order.
    pub fn run<S, R>(&self, rng: &mut S, recorder: &mut R) -> Result<ExperimentSummary>
    where
        S: RandomSource + ?Sized,
        R: Recorder + ?Sized,
    {
        info!(
            "starting {} runs of {} qubits (noise {:.3}, schedule {:?})",
            self.config.num_runs,
            self.config.qubits_per_run,
            self.config.natural_noise,
            self.config.schedule
        );
        let mut summary = ExperimentSummary::default();
        for outcome in self.iter(rng) {
            let outcome = outcome?;
            recorder.record(&outcome.record)?;
            summary.push(&outcome);
        }
        log_summary(&summary);
        Ok(summary)
    }

    /// Runs on the rayon pool, run `i` drawing from substream `i` of `seed`.
    ///
    /// Outcomes are buffered and handed to `recorder` only after the whole
    /// batch finishes, in run order, so the output only depends on `seed`.
    /// If any run fails nothing is recorded.
    #[cfg(feature = "parallel")]
    pub fn run_parallel<R>(&self, seed: u64, recorder: &mut R) -> Result<ExperimentSummary>
    where
        R: Recorder + ?Sized,
    {
        use crate::random::SeededSource;
        use rayon::prelude::*;

        info!(
            "starting {} parallel runs of {} qubits (seed {})",
            self.config.num_runs, self.config.qubits_per_run, seed
        );
        let outcomes: Vec<RunOutcome> = (0..self.config.num_runs)
            .into_par_iter()
            .map(|index| {
                let mut rng = SeededSource::for_stream(seed, index as u64);
                self.run_once(index, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut summary = ExperimentSummary::default();
        for outcome in &outcomes {
            recorder.record(&outcome.record)?;
            summary.push(outcome);
        }
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &ExperimentSummary) {
    info!(
        "finished {} runs: {} attacked (mean QBER {:.4}), {} clean (mean QBER {:.4}), {} empty",
        summary.runs,
        summary.attacked_runs,
        summary.mean_qber_attacked,
        summary.clean_runs(),
        summary.mean_qber_clean,
        summary.empty_runs
    );
}

/// Iterator returned by [`ExperimentRunner::iter`].
pub struct Runs<'a, S: ?Sized> {
    runner: &'a ExperimentRunner,
    rng: &'a mut S,
    next: usize,
}

impl<'a, S: RandomSource + ?Sized> Iterator for Runs<'a, S> {
    type Item = Result<RunOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.runner.config.num_runs {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.runner.run_once(index, &mut *self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.runner.config.num_runs - self.next;
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::testing::ScriptedSource;
    use crate::random::SeededSource;
    use crate::recorder::MemoryRecorder;

    fn config(num_runs: usize, qubits: usize, noise: f64, schedule: AttackSchedule) -> ExperimentConfig {
        ExperimentConfig {
            num_runs,
            qubits_per_run: qubits,
            natural_noise: noise,
            schedule,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(ExperimentRunner::new(config(1, 0, 0.0, AttackSchedule::Never)).is_err());
        assert!(ExperimentRunner::new(config(1, 10, 2.0, AttackSchedule::Never)).is_err());
        assert!(ExperimentRunner::new(config(
            1,
            10,
            0.0,
            AttackSchedule::Alternating { low: 0.5, high: 0.1 }
        ))
        .is_err());
        assert!(ExperimentRunner::new(config(1, 10, 0.0, AttackSchedule::Constant(1.5))).is_err());
    }

    #[test]
    fn test_alternating_schedule() {
        let schedule = AttackSchedule::Alternating {
            low: 0.01,
            high: 0.15,
        };
        let mut rng = ScriptedSource::new(&[], &[0.5]);
        assert_eq!(schedule.intensity_for(0, &mut rng), 0.0);
        let p = schedule.intensity_for(1, &mut rng);
        assert!((p - 0.08).abs() < 1e-12);
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_random_schedule_draws_decision_first() {
        let schedule = AttackSchedule::Random {
            probability: 0.5,
            low: 0.1,
            high: 0.2,
        };
        let mut rng = ScriptedSource::new(&[], &[0.7, 0.2, 0.0]);
        assert_eq!(schedule.intensity_for(0, &mut rng), 0.0);
        assert!((schedule.intensity_for(1, &mut rng) - 0.1).abs() < 1e-12);
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_emits_one_record_per_run_in_order() {
        let runner = ExperimentRunner::new(config(
            10,
            200,
            0.01,
            AttackSchedule::Alternating {
                low: 0.01,
                high: 0.15,
            },
        ))
        .unwrap();
        let mut rng = SeededSource::from_seed(10);
        let mut recorder = MemoryRecorder::default();
        let summary = runner.run(&mut rng, &mut recorder).unwrap();

        assert_eq!(recorder.records().len(), 10);
        for (i, record) in recorder.records().iter().enumerate() {
            assert_eq!(record.attack_present, i % 2 == 1, "run {}", i);
            assert!((0.0..=1.0).contains(&record.qber));
        }
        assert_eq!(summary.runs, 10);
        assert_eq!(summary.attacked_runs, 5);
        assert_eq!(summary.clean_runs(), 5);
    }

    #[test]
    fn test_iter_matches_run() {
        let runner = ExperimentRunner::new(config(6, 100, 0.05, AttackSchedule::Constant(0.3))).unwrap();
        let from_iter: Vec<ExperimentRecord> = runner
            .iter(&mut SeededSource::from_seed(77))
            .map(|o| o.unwrap().record)
            .collect();
        let mut recorder = MemoryRecorder::default();
        runner
            .run(&mut SeededSource::from_seed(77), &mut recorder)
            .unwrap();
        assert_eq!(from_iter, recorder.records());
    }

    #[test]
    fn test_outcome_counts_are_consistent() {
        let runner = ExperimentRunner::new(config(1, 1000, 0.0, AttackSchedule::Constant(1.0))).unwrap();
        let outcome = runner.run_once(0, &mut SeededSource::from_seed(3)).unwrap();
        assert_eq!(outcome.qubits_sent, 1000);
        assert_eq!(outcome.intercepted, 1000);
        assert!(outcome.sifted_len <= 1000);
        assert_eq!(
            outcome.record.qber,
            outcome.errors as f64 / outcome.sifted_len as f64
        );
    }

    #[test]
    fn test_single_qubit_run_may_sift_empty() {
        // value, basis, intercept check, noise check, receiver basis (mismatch), outcome
        let runner = ExperimentRunner::new(config(1, 1, 0.0, AttackSchedule::Never)).unwrap();
        let mut rng = ScriptedSource::new(&[true, false, true, false], &[0.5, 0.5]);
        let outcome = runner.run_once(0, &mut rng).unwrap();
        assert_eq!(outcome.sifted_len, 0);
        assert_eq!(outcome.record.qber, 0.0);
        assert!(!outcome.record.attack_present);
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_summary_counts_empty_sifts() {
        let runner = ExperimentRunner::new(config(2, 1, 0.0, AttackSchedule::Never)).unwrap();
        let mut rng = ScriptedSource::new(
            &[
                // run 0: receiver basis mismatches, outcome drawn
                true, false, true, false,
                // run 1: receiver basis matches
                false, false, false,
            ],
            &[0.5, 0.5, 0.5, 0.5],
        );
        let mut recorder = MemoryRecorder::default();
        let summary = runner.run(&mut rng, &mut recorder).unwrap();
        assert!(rng.is_exhausted());

        // both records read 0.0, only the summary tells them apart
        assert_eq!(
            recorder.records(),
            &[
                ExperimentRecord { qber: 0.0, attack_present: false },
                ExperimentRecord { qber: 0.0, attack_present: false },
            ]
        );
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.empty_runs, 1);
        assert_eq!(summary.mean_qber_clean, 0.0);
    }

    #[test]
    fn test_config_json_round_trip() {
        let default = ExperimentConfig::default();
        let json = serde_json::to_string(&default).unwrap();
        let back: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, default);

        let json = r#"{
            "num_runs": 20,
            "qubits_per_run": 500,
            "natural_noise": 0.02,
            "schedule": { "Random": { "probability": 0.3, "low": 0.05, "high": 0.2 } }
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.schedule,
            AttackSchedule::Random {
                probability: 0.3,
                low: 0.05,
                high: 0.2
            }
        );
        assert_eq!(config.num_runs, 20);
        assert!(config.validate().is_ok());
        let again: ExperimentConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(again, config);

        let never: ExperimentConfig = serde_json::from_str(
            r#"{"num_runs":1,"qubits_per_run":1,"natural_noise":0.0,"schedule":"Never"}"#,
        )
        .unwrap();
        assert_eq!(never.schedule, AttackSchedule::Never);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let runner = ExperimentRunner::new(config(
            8,
            300,
            0.02,
            AttackSchedule::Random {
                probability: 0.5,
                low: 0.05,
                high: 0.5,
            },
        ))
        .unwrap();
        let mut a = MemoryRecorder::default();
        let mut b = MemoryRecorder::default();
        runner.run(&mut SeededSource::from_seed(99), &mut a).unwrap();
        runner.run(&mut SeededSource::from_seed(99), &mut b).unwrap();
        assert_eq!(a.records(), b.records());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_per_stream_sequential() {
        let runner = ExperimentRunner::new(config(
            12,
            250,
            0.01,
            AttackSchedule::Alternating {
                low: 0.05,
                high: 0.15,
            },
        ))
        .unwrap();
        let mut parallel = MemoryRecorder::default();
        let summary = runner.run_parallel(5, &mut parallel).unwrap();
        assert_eq!(summary.runs, 12);

        let expected: Vec<ExperimentRecord> = (0..12)
            .map(|i| {
                runner
                    .run_once(i, &mut SeededSource::for_stream(5, i as u64))
                    .unwrap()
                    .record
            })
            .collect();
        assert_eq!(parallel.records(), expected.as_slice());
    }
}
