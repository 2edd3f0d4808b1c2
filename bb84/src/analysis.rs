//! Attack detection on a recorded QBER dataset.
//!
//! Reads the delimited format written by [`CsvRecorder`](crate::recorder::CsvRecorder),
//! splits it, fits a one-feature logistic regression on QBER, and scores it
//! with a confusion matrix.

use std::fmt;
use std::io::BufRead;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Bb84Error, Result};
use crate::experiment::ExperimentRecord;

/// Parses `QBER_Value,Attack_Detected` rows. The header line and blank lines
/// are skipped.
pub fn read_dataset<R: BufRead>(reader: R) -> Result<Vec<ExperimentRecord>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        let line_no = i + 1;
        if line.is_empty() || (line_no == 1 && line.starts_with("QBER_Value")) {
            continue;
        }

        let (qber, flag) = line.split_once(',').ok_or_else(|| Bb84Error::Parse {
            line: line_no,
            reason: "expected two comma separated fields".to_string(),
        })?;
        let qber: f64 = qber.trim().parse().map_err(|e| Bb84Error::Parse {
            line: line_no,
            reason: format!("bad QBER value {:?}: {}", qber, e),
        })?;
        if !(0.0..=1.0).contains(&qber) {
            return Err(Bb84Error::Parse {
                line: line_no,
                reason: format!("QBER {} outside [0, 1]", qber),
            });
        }
        let attack_present = match flag.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(Bb84Error::Parse {
                    line: line_no,
                    reason: format!("bad attack flag {:?}", other),
                })
            }
        };
        records.push(ExperimentRecord {
            qber,
            attack_present,
        });
    }
    Ok(records)
}

/// Shuffles `records` and moves `test_fraction` of them into the test set.
///
/// Returns `(train, test)`.
pub fn train_test_split<R: Rng + ?Sized>(
    records: &[ExperimentRecord],
    test_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<ExperimentRecord>, Vec<ExperimentRecord>)> {
    crate::error::validate_prob("test fraction", test_fraction)?;

    let mut shuffled = records.to_vec();
    shuffled.shuffle(rng);

    let test_len = (records.len() as f64 * test_fraction).round() as usize;
    let test = shuffled.split_off(records.len() - test_len);
    Ok((shuffled, test))
}

/// Per-class QBER histogram over equal-width bins.
#[derive(Debug, Clone, PartialEq)]
pub struct QberHistogram {
    pub min: f64,
    pub max: f64,
    pub clean: Vec<usize>,
    pub attacked: Vec<usize>,
}

impl QberHistogram {
    pub fn new(records: &[ExperimentRecord], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Bb84Error::InvalidConfig("histogram needs at least one bin".to_string()));
        }
        let min = records.iter().map(|r| r.qber).fold(f64::INFINITY, f64::min);
        let max = records.iter().map(|r| r.qber).fold(f64::NEG_INFINITY, f64::max);
        let (min, max) = if records.is_empty() { (0.0, 0.0) } else { (min, max) };

        let mut clean = vec![0; bins];
        let mut attacked = vec![0; bins];
        let width = (max - min) / bins as f64;
        for r in records {
            let bin = if width > 0.0 {
                (((r.qber - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            if r.attack_present {
                attacked[bin] += 1;
            } else {
                clean[bin] += 1;
            }
        }

        Ok(Self {
            min,
            max,
            clean,
            attacked,
        })
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.clean.len() as f64
    }
}

impl fmt::Display for QberHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>18}  {:>8}  {:>8}", "QBER [%]", "clean", "attacked")?;
        let width = self.bin_width();
        for (i, (c, a)) in self.clean.iter().zip(&self.attacked).enumerate() {
            let lo = (self.min + width * i as f64) * 100.0;
            let hi = (self.min + width * (i + 1) as f64) * 100.0;
            writeln!(f, "{:>8.3} - {:>7.3}  {:>8}  {:>8}", lo, hi, c, a)?;
        }
        Ok(())
    }
}

/// Logistic regression on a single standardised QBER feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticDetector {
    pub weight: f64,
    pub bias: f64,
    mean: f64,
    scale: f64,
}

impl LogisticDetector {
    /// Batch gradient descent on the log loss. Both classes must be present.
    pub fn fit(records: &[ExperimentRecord], learning_rate: f64, epochs: usize) -> Result<Self> {
        let attacked = records.iter().filter(|r| r.attack_present).count();
        if attacked == 0 || attacked == records.len() {
            return Err(Bb84Error::InvalidConfig(
                "training data must contain both clean and attacked runs".to_string(),
            ));
        }

        let n = records.len() as f64;
        let mean = records.iter().map(|r| r.qber).sum::<f64>() / n;
        let var = records.iter().map(|r| (r.qber - mean).powi(2)).sum::<f64>() / n;
        let scale = if var > 0.0 { var.sqrt() } else { 1.0 };

        let mut detector = Self {
            weight: 0.0,
            bias: 0.0,
            mean,
            scale,
        };
        for _ in 0..epochs {
            let (mut gw, mut gb) = (0.0, 0.0);
            for r in records {
                let x = detector.standardise(r.qber);
                let y = if r.attack_present { 1.0 } else { 0.0 };
                let err = sigmoid(detector.weight * x + detector.bias) - y;
                gw += err * x;
                gb += err;
            }
            detector.weight -= learning_rate * gw / n;
            detector.bias -= learning_rate * gb / n;
        }
        debug!(
            "fitted detector: weight={:.4} bias={:.4} threshold={:?}",
            detector.weight,
            detector.bias,
            detector.decision_threshold()
        );
        Ok(detector)
    }

    fn standardise(&self, qber: f64) -> f64 {
        (qber - self.mean) / self.scale
    }

    /// Probability that a run with this QBER was attacked.
    pub fn predict_proba(&self, qber: f64) -> f64 {
        sigmoid(self.weight * self.standardise(qber) + self.bias)
    }

    pub fn predict(&self, qber: f64) -> bool {
        self.predict_proba(qber) >= 0.5
    }

    /// QBER at which the predicted probability crosses 0.5.
    pub fn decision_threshold(&self) -> Option<f64> {
        if self.weight == 0.0 {
            return None;
        }
        Some(self.mean - self.bias / self.weight * self.scale)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn evaluate(detector: &LogisticDetector, records: &[ExperimentRecord]) -> Self {
        let mut m = Self::default();
        for r in records {
            match (detector.predict(r.qber), r.attack_present) {
                (true, true) => m.true_positive += 1,
                (true, false) => m.false_positive += 1,
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_negative += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16}  {:>10}  {:>10}", "", "pred clean", "pred attack")?;
        writeln!(
            f,
            "{:>16}  {:>10}  {:>10}",
            "actual clean", self.true_negative, self.false_positive
        )?;
        write!(
            f,
            "{:>16}  {:>10}  {:>10}",
            "actual attack", self.false_negative, self.true_positive
        )
    }
}
