use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::cache::CalculationKey;
use crate::dtype::DataType;
use crate::kv_cache::KvEstimate;
use crate::strategy::Calculator;

/// A change of model, user count or context length.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub model_id: String,
    pub users: u32,
    pub context_length: u32,
    pub params_b: f64,
}

impl BatchRequest {
    /// One key per supported data type.
    pub fn keys(&self) -> Vec<CalculationKey> {
        DataType::ALL
            .iter()
            .map(|&dtype| CalculationKey::new(self.model_id.clone(), self.users, self.context_length, dtype))
            .collect()
    }
}

/// Reported by a finished calculation task.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub key: CalculationKey,
    pub estimate: KvEstimate,
}

/// Effect of one completion on the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still waiting on this many keys.
    Remaining(usize),
    /// The last outstanding key landed; the batch is gone.
    Settled,
    /// The key is not outstanding in the current batch.
    Stale,
}

#[derive(Debug)]
struct PendingBatch {
    model_id: String,
    outstanding: HashSet<CalculationKey>,
}

/// Fans a parameter change out into one calculation per data type and tracks
/// when the whole set has landed.
///
/// Lives on the UI thread. Calculations run on the tokio runtime and report
/// back through a channel; only this type touches the outstanding set.
pub struct BatchOrchestrator {
    calculator: Arc<Calculator>,
    runtime: Handle,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    pending: Option<PendingBatch>,
}

impl BatchOrchestrator {
    pub fn new(calculator: Arc<Calculator>, runtime: Handle) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            calculator,
            runtime,
            completions_tx,
            completions_rx,
            pending: None,
        }
    }

    /// Replaces any batch in flight and dispatches a calculation for every data type.
    ///
    /// Tasks from the replaced batch keep running and still fill the result
    /// cache, but their completions no longer count towards the new batch
    /// unless the new batch is waiting on the very same key.
    pub fn on_parameter_change(&mut self, request: &BatchRequest) -> Vec<CalculationKey> {
        let keys = request.keys();
        if let Some(previous) = self.pending.take() {
            debug!(
                "discarding batch for {} with {} outstanding",
                previous.model_id,
                previous.outstanding.len()
            );
        }
        debug!(
            "dispatching batch for {} (users={}, context={})",
            request.model_id, request.users, request.context_length
        );
        self.pending = Some(PendingBatch {
            model_id: request.model_id.clone(),
            outstanding: keys.iter().cloned().collect(),
        });

        for key in &keys {
            let calculator = Arc::clone(&self.calculator);
            let tx = self.completions_tx.clone();
            let key = key.clone();
            let params_b = request.params_b;
            self.runtime.spawn(async move {
                let estimate = calculator.resolve(&key, params_b).await;
                if tx.send(Completion { key, estimate }).is_err() {
                    debug!("orchestrator gone, dropping completion");
                }
            });
        }
        keys
    }

    /// Books one completion against the current batch.
    pub fn apply_completion(&mut self, completion: &Completion) -> Progress {
        let Some(batch) = self.pending.as_mut() else {
            debug!("completion for {:?} with no batch pending", completion.key);
            return Progress::Stale;
        };
        if !batch.outstanding.remove(&completion.key) {
            debug!("stale completion for {:?}", completion.key);
            return Progress::Stale;
        }
        if batch.outstanding.is_empty() {
            debug!("batch for {} settled", batch.model_id);
            self.pending = None;
            return Progress::Settled;
        }
        Progress::Remaining(batch.outstanding.len())
    }

    /// Applies every completion that has already arrived, without waiting.
    pub fn poll_completions(&mut self) -> Vec<Completion> {
        let mut landed = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(&completion);
            landed.push(completion);
        }
        landed
    }

    /// Waits for the next completion and applies it.
    pub async fn next_completion(&mut self) -> Option<(Completion, Progress)> {
        let completion = self.completions_rx.recv().await?;
        let progress = self.apply_completion(&completion);
        Some((completion, progress))
    }

    /// Stops tracking the current batch, e.g. when the model list is replaced.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub const fn is_batch_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn outstanding(&self) -> usize {
        self.pending.as_ref().map_or(0, |batch| batch.outstanding.len())
    }

    pub fn is_outstanding(&self, key: &CalculationKey) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|batch| batch.outstanding.contains(key))
    }

    /// Non-blocking read for rendering; `None` while the value is still being computed.
    pub fn cached_result(&self, key: &CalculationKey) -> Option<KvEstimate> {
        self.calculator.results().get(key)
    }

    /// Sender side of the completion channel.
    pub fn completion_sender(&self) -> UnboundedSender<Completion> {
        self.completions_tx.clone()
    }
}
