use crate::domain::errors::BackendError;
use crate::domain::ml::example_codec::{self, feature};
use crate::domain::ml::feature_record::EX_FLOOR_PRICE;
use crate::domain::ports::ScoringBackend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where a failing stub breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Allocation,
    Invocation,
    MissingOutput,
    Extraction,
    Panic,
}

#[derive(Debug, Clone)]
enum Behavior {
    Output(Vec<f32>),
    FloorMultiplier(f32),
    Fail(FailureMode),
}

/// One recorded `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubCall {
    pub input_node: String,
    pub output_node: String,
    pub batch_size: usize,
}

#[derive(Debug, Default)]
struct TensorLedger {
    live: AtomicUsize,
    released: AtomicUsize,
}

/// Counts a stub tensor as live until dropped.
#[derive(Debug)]
struct TensorGuard {
    ledger: Arc<TensorLedger>,
}

impl TensorGuard {
    fn acquire(ledger: &Arc<TensorLedger>) -> Self {
        ledger.live.fetch_add(1, Ordering::SeqCst);
        Self {
            ledger: ledger.clone(),
        }
    }
}

impl Drop for TensorGuard {
    fn drop(&mut self) {
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct StubInput {
    examples: Vec<Vec<u8>>,
    _guard: TensorGuard,
}

#[derive(Debug)]
pub struct StubOutput {
    values: Vec<f32>,
    _guard: TensorGuard,
}

/// In-process scoring backend with deterministic output.
///
/// Tracks every tensor it hands out so tests can assert that nothing outlives
/// a prediction call.
#[derive(Debug)]
pub struct StubBackend {
    behavior: Behavior,
    delay: Option<Duration>,
    ledger: Arc<TensorLedger>,
    calls: Mutex<Vec<StubCall>>,
}

impl StubBackend {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            ledger: Arc::new(TensorLedger::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Echoes `score` for any input.
    pub fn constant(score: f32) -> Self {
        Self::new(Behavior::Output(vec![score]))
    }

    /// Returns `values` verbatim, whatever their length.
    pub fn with_output(values: Vec<f32>) -> Self {
        Self::new(Behavior::Output(values))
    }

    /// Scores each example as `ex_floor_price * factor`.
    pub fn floor_multiplier(factor: f32) -> Self {
        Self::new(Behavior::FloorMultiplier(factor))
    }

    pub fn failing(mode: FailureMode) -> Self {
        Self::new(Behavior::Fail(mode))
    }

    /// Blocks inside `run` for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn live_tensors(&self) -> usize {
        self.ledger.live.load(Ordering::SeqCst)
    }

    pub fn released_tensors(&self) -> usize {
        self.ledger.released.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn floor_price(example_bytes: &[u8]) -> Result<f32, BackendError> {
        let example = example_codec::deserialize(example_bytes)?;
        match example.feature(EX_FLOOR_PRICE) {
            Some(feature::Kind::FloatList(list)) if list.value.len() == 1 => Ok(list.value[0]),
            _ => Err(BackendError::Invocation {
                reason: format!("{} is not a single float", EX_FLOOR_PRICE),
            }),
        }
    }
}

impl ScoringBackend for StubBackend {
    type Input = StubInput;
    type Output = StubOutput;

    fn example_batch(&self, examples: &[Vec<u8>]) -> Result<StubInput, BackendError> {
        if let Behavior::Fail(FailureMode::Allocation) = self.behavior {
            return Err(BackendError::Allocation {
                reason: "stub refused allocation".to_string(),
            });
        }

        Ok(StubInput {
            examples: examples.to_vec(),
            _guard: TensorGuard::acquire(&self.ledger),
        })
    }

    fn run(
        &self,
        input_node: &str,
        input: &StubInput,
        output_node: &str,
    ) -> Result<StubOutput, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(StubCall {
                input_node: input_node.to_string(),
                output_node: output_node.to_string(),
                batch_size: input.examples.len(),
            });
        }

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let values = match &self.behavior {
            Behavior::Output(values) => values.clone(),
            Behavior::FloorMultiplier(factor) => input
                .examples
                .iter()
                .map(|bytes| Self::floor_price(bytes).map(|price| price * factor))
                .collect::<Result<Vec<_>, _>>()?,
            Behavior::Fail(FailureMode::Invocation) => {
                return Err(BackendError::Invocation {
                    reason: "stub session error".to_string(),
                });
            }
            Behavior::Fail(FailureMode::MissingOutput) => {
                return Err(BackendError::MissingOutput {
                    node: output_node.to_string(),
                });
            }
            Behavior::Fail(FailureMode::Panic) => panic!("stub backend panicked mid-run"),
            Behavior::Fail(FailureMode::Allocation | FailureMode::Extraction) => Vec::new(),
        };

        Ok(StubOutput {
            values,
            _guard: TensorGuard::acquire(&self.ledger),
        })
    }

    fn scalars(&self, output: &StubOutput) -> Result<Vec<f32>, BackendError> {
        if let Behavior::Fail(FailureMode::Extraction) = self.behavior {
            return Err(BackendError::Invocation {
                reason: "stub output is not f32".to_string(),
            });
        }
        Ok(output.values.clone())
    }

    fn name(&self) -> &str {
        "Stub"
    }
}
