//! Training and evaluation over a labelled dataset.
//!
//! Training runs in two phases. [`Network::prepare_training`] checks every
//! precondition, indexes the dataset and labels the output layer; it either
//! fails before anything is touched or returns a [`TrainingPlan`].
//! [`Network::run_training`] then drives the epochs, where a sample that
//! cannot be used is skipped and counted instead of aborting the run.

use super::network::Network;
use crate::dataset::{DatasetIndex, ImageDecoder, SampleDecoder};
use crate::error::NetworkError;
use crate::stats::{EvaluationReport, TrainingSummary};
use std::collections::HashMap;
use std::path::Path;

/// Why a sample did not contribute to training
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Undecodable,
    WrongSize { expected: usize, actual: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undecodable => write!(f, "could not be decoded"),
            Self::WrongSize { expected, actual } => {
                write!(f, "has {} values, expected {}", actual, expected)
            }
        }
    }
}

/// Result of feeding one sample through the training pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    Processed,
    Skipped(SkipReason),
}

/// Everything the epoch loop needs, produced by a successful setup phase
#[derive(Clone, Debug)]
pub struct TrainingPlan {
    index: DatasetIndex,
    epochs: usize,
}

impl TrainingPlan {
    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }
}

impl Network {
    /// Train on the configured dataset with the default image decoder
    pub fn education(&mut self) -> Result<TrainingSummary, NetworkError> {
        self.education_with(&ImageDecoder)
    }

    pub fn education_with(
        &mut self,
        decoder: &dyn SampleDecoder,
    ) -> Result<TrainingSummary, NetworkError> {
        let plan = self.prepare_training()?;
        Ok(self.run_training(&plan, decoder))
    }

    /// Setup phase: preconditions, dataset indexing and output labelling.
    ///
    /// Weights are never modified here.
    pub fn prepare_training(&mut self) -> Result<TrainingPlan, NetworkError> {
        let root = self.require_dataset()?.to_path_buf();
        let epochs = self
            .epoch()
            .ok_or_else(|| NetworkError::NotInitialized("epoch is not set".to_string()))?;
        if self.categories().is_empty() {
            return Err(NetworkError::NotInitialized(
                "categories are not set".to_string(),
            ));
        }

        let index = DatasetIndex::scan(&root, self.categories())?;
        let expected = self.output_layer().size();
        if index.len() != expected {
            return Err(NetworkError::CategoryMismatch {
                found: index.len(),
                expected,
            });
        }

        let output = self.output_layer_mut();
        for (position, category) in index.categories().enumerate() {
            output.set_category(position, category)?;
        }
        self.warn_shared_labels();

        log::info!(
            "Dataset indexed: {} categories, {} samples",
            index.len(),
            index.sample_count()
        );
        Ok(TrainingPlan { index, epochs })
    }

    /// Epoch loop: every sample of every category, `epochs` times
    pub fn run_training(
        &mut self,
        plan: &TrainingPlan,
        decoder: &dyn SampleDecoder,
    ) -> TrainingSummary {
        let mut summary = TrainingSummary::new(plan.epochs);

        for epoch in 0..plan.epochs {
            for (category, samples) in plan.index.iter() {
                for sample in samples {
                    let outcome = self.train_sample(category, sample, decoder);
                    if let SampleOutcome::Skipped(reason) = &outcome {
                        log::warn!("Sample {} skipped: {}", sample.display(), reason);
                    }
                    summary.record(&outcome);
                }
            }
            log::debug!("Epoch {}/{} done", epoch + 1, plan.epochs);
        }

        log::info!("Training finished: {}", summary);
        summary
    }

    fn train_sample(
        &mut self,
        category: &str,
        sample: &Path,
        decoder: &dyn SampleDecoder,
    ) -> SampleOutcome {
        match decoder.decode(sample) {
            Some(pixels) => self.learn(&pixels, category),
            None => SampleOutcome::Skipped(SkipReason::Undecodable),
        }
    }

    /// One training iteration on a decoded sample: inject, forward pass,
    /// backward pass, weight update
    pub fn learn(&mut self, pixels: &[f64], category: &str) -> SampleOutcome {
        let expected = self.input_layer().size();
        if pixels.len() != expected {
            return SampleOutcome::Skipped(SkipReason::WrongSize {
                expected,
                actual: pixels.len(),
            });
        }
        if self.inject(pixels).is_err() {
            return SampleOutcome::Skipped(SkipReason::WrongSize {
                expected,
                actual: pixels.len(),
            });
        }

        self.forward();
        self.backward(category);
        self.update_weights();
        SampleOutcome::Processed
    }

    /// Run inference over every sample of the configured dataset and count
    /// how many are classified into their own category
    pub fn check_on_data(&mut self) -> Result<EvaluationReport, NetworkError> {
        self.check_on_data_with(&ImageDecoder)
    }

    pub fn check_on_data_with(
        &mut self,
        decoder: &dyn SampleDecoder,
    ) -> Result<EvaluationReport, NetworkError> {
        let root = self.require_dataset()?.to_path_buf();
        if self.categories().is_empty() {
            return Err(NetworkError::NotInitialized(
                "categories are not set".to_string(),
            ));
        }

        let index = DatasetIndex::scan(&root, self.categories())?;
        let mut report = EvaluationReport::default();

        for (category, samples) in index.iter() {
            for sample in samples {
                match self.infer(sample, decoder) {
                    Some(result) if result.iter().any(|c| c == category) => {
                        log::debug!("Yes! {} is correct", sample.display());
                        report.correct += 1;
                    }
                    Some(result) => {
                        log::debug!("No! {} classified as {:?}", sample.display(), result);
                        report.incorrect += 1;
                    }
                    None => report.skipped += 1,
                }
            }
        }

        log::info!("Evaluation finished: {}", report);
        Ok(report)
    }

    fn require_dataset(&self) -> Result<&Path, NetworkError> {
        let root = self
            .dataset()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| NetworkError::NotInitialized("dataset path is not set".to_string()))?;
        if !root.exists() {
            return Err(NetworkError::FolderNotFound(root.to_path_buf()));
        }
        Ok(root)
    }

    /// Labels are matched by membership, so a label on several output
    /// neurons makes all of them targets for that label
    fn warn_shared_labels(&self) {
        let mut owners: HashMap<&str, usize> = HashMap::new();
        for neuron in self.output_layer() {
            for category in neuron.categories() {
                *owners.entry(category.as_str()).or_insert(0) += 1;
            }
        }
        for (category, count) in owners {
            if count > 1 {
                log::warn!("Category {} is assigned to {} output neurons", category, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::Stage;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn build(input: usize, hidden: &[usize], output: usize) -> Network {
        Network::new_with_seed(
            Stage::single_of(input),
            Stage::grouped_of(hidden),
            Stage::single_of(output),
            17,
        )
        .unwrap()
    }

    /// Dataset folders with empty placeholder samples; a closure decoder
    /// supplies the pixels
    fn dataset(categories: &[(&str, usize)]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for (category, count) in categories {
            let folder = dir.path().join(category);
            std::fs::create_dir(&folder).unwrap();
            for i in 0..*count {
                std::fs::write(folder.join(format!("{}.png", i)), b"").unwrap();
            }
        }
        dir
    }

    fn fixed(path: &Path) -> Option<Vec<f64>> {
        let category = path.parent()?.file_name()?.to_str()?;
        match category {
            "cat" => Some(vec![0.9, 0.8, 0.1, 0.2]),
            "dog" => Some(vec![0.1, 0.2, 0.9, 0.8]),
            _ => None,
        }
    }

    #[test]
    fn test_missing_dataset_path() {
        let mut net = build(4, &[3], 2);
        net.set_epoch(1);
        net.set_categories(&["cat", "dog"]);
        assert!(matches!(
            net.education_with(&fixed),
            Err(NetworkError::NotInitialized(_))
        ));

        net.set_dataset("/no/such/folder");
        assert!(matches!(
            net.education_with(&fixed),
            Err(NetworkError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_missing_epoch_or_categories() {
        let dir = dataset(&[("cat", 1), ("dog", 1)]);

        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_categories(&["cat", "dog"]);
        assert!(matches!(
            net.prepare_training(),
            Err(NetworkError::NotInitialized(_))
        ));

        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(1);
        assert!(matches!(
            net.prepare_training(),
            Err(NetworkError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_category_mismatch_touches_nothing() {
        let dir = dataset(&[("cat", 1), ("dog", 1), ("bird", 1)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(3);
        net.set_categories(&["cat", "dog", "bird"]);
        let before = net.synapse_weights();

        let err = net.education_with(&fixed).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::CategoryMismatch { found: 3, expected: 2 }
        ));
        assert_eq!(net.synapse_weights(), before);
        assert!(net.output_layer().iter().all(|n| n.categories().is_empty()));
    }

    #[test]
    fn test_zero_epochs_keeps_weights() {
        let dir = dataset(&[("cat", 2), ("dog", 2)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(0);
        net.set_categories(&["cat", "dog"]);
        let before = net.synapse_weights();

        let summary = net.education_with(&fixed).unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(net.synapse_weights(), before);
    }

    #[test]
    fn test_labels_follow_category_order() {
        let dir = dataset(&[("dog", 1), ("cat", 1)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(0);
        net.set_categories(&["cat", "dog"]);

        let plan = net.prepare_training().unwrap();
        assert_eq!(plan.epochs(), 0);
        let labels: Vec<_> = net
            .output_layer()
            .iter()
            .map(|n| n.categories().to_vec())
            .collect();
        assert_eq!(labels, vec![vec!["cat".to_string()], vec!["dog".to_string()]]);
    }

    #[test]
    fn test_bad_samples_are_skipped() {
        let dir = dataset(&[("cat", 2), ("dog", 1)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(2);
        net.set_categories(&["cat", "dog"]);

        // cat/0.png is undecodable, every dog sample has the wrong size
        let decoder = |path: &Path| -> Option<Vec<f64>> {
            let name = path.file_name()?.to_str()?;
            let folder = path.parent()?.file_name()?.to_str()?;
            match (folder, name) {
                ("cat", "0.png") => None,
                ("dog", _) => Some(vec![0.5; 3]),
                _ => fixed(path),
            }
        };

        let summary = net.education_with(&decoder).unwrap();
        assert_eq!(summary.epochs, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 4);
    }

    #[test]
    fn test_learn_rejects_wrong_size() {
        let mut net = build(4, &[3], 2);
        let before = net.synapse_weights();
        assert_eq!(
            net.learn(&[0.1; 5], "cat"),
            SampleOutcome::Skipped(SkipReason::WrongSize {
                expected: 4,
                actual: 5
            })
        );
        assert_eq!(net.synapse_weights(), before);
    }

    #[test]
    fn test_check_on_data_counts() {
        let dir = dataset(&[("cat", 2), ("dog", 2)]);
        let mut net = build(4, &[6], 2);
        net.set_dataset(dir.path());
        net.set_epoch(0);
        net.set_categories(&["cat", "dog"]);
        net.prepare_training().unwrap();

        let report = net.check_on_data_with(&fixed).unwrap();
        assert_eq!(report.total(), 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.correct + report.incorrect, 4);
    }

    #[test]
    fn test_plan_index_is_exposed() {
        let dir = dataset(&[("cat", 1), ("dog", 3)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(1);
        net.set_categories(&["cat", "dog"]);

        let plan = net.prepare_training().unwrap();
        let dogs: Vec<PathBuf> = plan.index().iter().nth(1).unwrap().1.to_vec();
        assert_eq!(dogs.len(), 3);
        assert_eq!(plan.index().sample_count(), 4);
    }

    fn labels(net: &Network) -> Vec<Vec<String>> {
        net.output_layer()
            .iter()
            .map(|n| n.categories().to_vec())
            .collect()
    }

    #[test]
    fn test_retraining_replaces_labels() {
        let dir = dataset(&[("cat", 1), ("dog", 1)]);
        let mut net = build(4, &[3], 2);
        net.set_dataset(dir.path());
        net.set_epoch(1);
        net.set_categories(&["cat", "dog"]);
        net.education_with(&fixed).unwrap();
        assert_eq!(labels(&net), vec![vec!["cat".to_string()], vec!["dog".to_string()]]);

        net.set_categories(&["dog", "cat"]);
        let summary = net.education_with(&fixed).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(labels(&net), vec![vec!["dog".to_string()], vec!["cat".to_string()]]);

        // Exactly one output neuron is a target for each category
        net.learn(&[0.9, 0.8, 0.1, 0.2], "cat");
        let output = net.output_layer();
        let dog = output.get(0).unwrap();
        let cat = output.get(1).unwrap();
        assert!((dog.error() + dog.output()).abs() < 1e-12);
        assert!((cat.error() - (1.0 - cat.output())).abs() < 1e-12);
    }

    #[test]
    fn test_shared_label_targets_every_owner() {
        let mut net = build(4, &[3], 3);
        net.output_layer_mut().set_category(0, "cat").unwrap();
        net.output_layer_mut().set_category(1, "cat").unwrap();
        net.output_layer_mut().set_category(2, "dog").unwrap();
        net.warn_shared_labels();

        net.inject(&[0.9, 0.8, 0.1, 0.2]).unwrap();
        net.forward();
        net.backward("cat");

        let output = net.output_layer();
        for position in [0, 1] {
            let neuron = output.get(position).unwrap();
            assert!((neuron.error() - (1.0 - neuron.output())).abs() < 1e-12);
        }
        let dog = output.get(2).unwrap();
        assert!((dog.error() + dog.output()).abs() < 1e-12);
    }
}
