//! Counters reported by training and evaluation runs.

use crate::neural::SampleOutcome;
use serde::{Deserialize, Serialize};

/// Outcome of a training run that got past its preconditions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Epochs requested
    pub epochs: usize,
    /// Sample iterations that updated the weights
    pub processed: usize,
    /// Sample iterations skipped (undecodable or wrong size)
    pub skipped: usize,
}

impl TrainingSummary {
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &SampleOutcome) {
        match outcome {
            SampleOutcome::Processed => self.processed += 1,
            SampleOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    /// True if at least one sample contributed to the weights
    pub fn trained(&self) -> bool {
        self.processed > 0
    }
}

impl std::fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "epochs={} processed={} skipped={}",
            self.epochs, self.processed, self.skipped
        )
    }
}

/// Classification results over a dataset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub correct: usize,
    pub incorrect: usize,
    /// Samples rejected before the forward pass
    pub skipped: usize,
}

impl EvaluationReport {
    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.skipped
    }

    /// Fraction of classified samples that were correct
    pub fn accuracy(&self) -> f32 {
        let classified = self.correct + self.incorrect;
        if classified == 0 {
            return 0.0;
        }
        self.correct as f32 / classified as f32
    }
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "correct={} incorrect={} skipped={} accuracy={:.1}%",
            self.correct,
            self.incorrect,
            self.skipped,
            100.0 * self.accuracy()
        )
    }
}
