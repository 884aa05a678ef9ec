//! Per-run result assembly (spec.md section 6, "Per-run result").
//!
//! This is the only place the core produces a JSON-shaped artifact; it is a
//! thin read-only view over an [`ExperimentOutcome`] and an
//! [`EvaluationReport`], not a component with its own state.

use crate::adversary::ContactRecord;
use crate::evaluator::EvaluationReport;
use crate::message::MessageRecord;
use crate::orchestrator::ExperimentOutcome;
use crate::settings::SimulationSettings;
use serde::{Deserialize, Serialize};

const CONTACT_SAMPLE_SIZE: usize = 100;
const SAMPLE_EPOCHS: usize = 10;
const SAMPLE_MESSAGES_PER_EPOCH: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub params: SimulationSettings,
    pub results: EvaluationReport,
    /// The ground-truth filename this run's graph was loaded from or
    /// persisted to (see [`crate::groundtruth::GroundTruthKey::filename`]).
    pub ground_truth: String,
    pub observer_contact_sample: Vec<ContactRecord>,
    pub message_sample: Vec<MessageRecord>,
}

impl RunResult {
    pub fn assemble(
        params: &SimulationSettings,
        ground_truth: String,
        outcome: &ExperimentOutcome,
        results: EvaluationReport,
    ) -> Self {
        Self {
            params: params.clone(),
            results,
            ground_truth,
            observer_contact_sample: outcome
                .adversary
                .contact_log()
                .iter()
                .take(CONTACT_SAMPLE_SIZE)
                .copied()
                .collect(),
            message_sample: message_sample(&outcome.log),
        }
    }
}

/// The first [`SAMPLE_EPOCHS`] distinct epochs present in the log, in
/// ascending order, each truncated to its first [`SAMPLE_MESSAGES_PER_EPOCH`]
/// messages (log order, i.e. emission order within the epoch).
fn message_sample(log: &[MessageRecord]) -> Vec<MessageRecord> {
    let mut epochs: Vec<usize> = log.iter().map(|m| m.t).collect();
    epochs.sort_unstable();
    epochs.dedup();
    epochs.truncate(SAMPLE_EPOCHS);

    let mut sample = Vec::new();
    for epoch in epochs {
        let mut taken = 0usize;
        for m in log.iter().filter(|m| m.t == epoch) {
            if taken >= SAMPLE_MESSAGES_PER_EPOCH {
                break;
            }
            sample.push(m.clone());
            taken += 1;
        }
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(t: usize, id: u64) -> MessageRecord {
        MessageRecord::new(t, id, vec![0, 1], 1000, false, false)
    }

    #[test]
    fn message_sample_caps_epochs_and_per_epoch_count() {
        let mut log = Vec::new();
        let mut id = 0;
        for t in 0..20 {
            for _ in 0..8 {
                log.push(msg(t, id));
                id += 1;
            }
        }
        let sample = message_sample(&log);
        let distinct_epochs: std::collections::HashSet<usize> = sample.iter().map(|m| m.t).collect();
        assert_eq!(distinct_epochs.len(), SAMPLE_EPOCHS);
        for epoch in distinct_epochs {
            let count = sample.iter().filter(|m| m.t == epoch).count();
            assert_eq!(count, SAMPLE_MESSAGES_PER_EPOCH);
        }
    }

    #[test]
    fn message_sample_handles_short_logs() {
        let log = vec![msg(0, 0), msg(0, 1)];
        let sample = message_sample(&log);
        assert_eq!(sample.len(), 2);
    }
}
