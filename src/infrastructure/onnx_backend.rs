use crate::domain::errors::BackendError;
use crate::domain::ml::example_codec::{self, feature};
use crate::domain::ports::ScoringBackend;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// One graph input, one value per example.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    Strings(Vec<String>),
    Floats(Vec<f32>),
    Int64s(Vec<i64>),
}

impl FeatureColumn {
    fn len(&self) -> usize {
        match self {
            FeatureColumn::Strings(v) => v.len(),
            FeatureColumn::Floats(v) => v.len(),
            FeatureColumn::Int64s(v) => v.len(),
        }
    }

    fn push(&mut self, name: &str, kind: &feature::Kind) -> Result<(), BackendError> {
        let single = |len: usize| {
            if len == 1 {
                Ok(())
            } else {
                Err(BackendError::Allocation {
                    reason: format!("feature {} has {} values, expected 1", name, len),
                })
            }
        };

        match (self, kind) {
            (FeatureColumn::Strings(col), feature::Kind::BytesList(list)) => {
                single(list.value.len())?;
                let text = String::from_utf8(list.value[0].clone()).map_err(|e| {
                    BackendError::Allocation {
                        reason: format!("feature {} is not UTF-8: {}", name, e),
                    }
                })?;
                col.push(text);
            }
            (FeatureColumn::Floats(col), feature::Kind::FloatList(list)) => {
                single(list.value.len())?;
                col.push(list.value[0]);
            }
            (FeatureColumn::Int64s(col), feature::Kind::Int64List(list)) => {
                single(list.value.len())?;
                col.push(list.value[0]);
            }
            _ => {
                return Err(BackendError::Allocation {
                    reason: format!("feature {} changes type within the batch", name),
                });
            }
        }
        Ok(())
    }

    fn empty_like(kind: &feature::Kind) -> Self {
        match kind {
            feature::Kind::BytesList(_) => FeatureColumn::Strings(Vec::new()),
            feature::Kind::FloatList(_) => FeatureColumn::Floats(Vec::new()),
            feature::Kind::Int64List(_) => FeatureColumn::Int64s(Vec::new()),
        }
    }

    fn to_value(&self, batch_size: usize) -> Result<DynValue, BackendError> {
        let shape = vec![batch_size, 1];
        let allocation = |e: ort::Error| BackendError::Allocation {
            reason: e.to_string(),
        };

        let value = match self {
            FeatureColumn::Strings(v) => Tensor::from_string_array((shape.as_slice(), v.as_slice()))
                .map_err(allocation)?
                .into_dyn(),
            FeatureColumn::Floats(v) => Tensor::from_array((shape.as_slice(), v.clone()))
                .map_err(allocation)?
                .into_dyn(),
            FeatureColumn::Int64s(v) => Tensor::from_array((shape.as_slice(), v.clone()))
                .map_err(allocation)?
                .into_dyn(),
        };
        Ok(value)
    }
}

/// A batch of examples expanded into per-feature columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OnnxExampleBatch {
    pub batch_size: usize,
    pub columns: BTreeMap<String, FeatureColumn>,
}

/// Decodes serialized examples into one column per feature.
///
/// ONNX Runtime has no example-parsing kernel, so exported graphs take each
/// feature as its own `[batch, 1]` input.
pub fn expand_examples(examples: &[Vec<u8>]) -> Result<OnnxExampleBatch, BackendError> {
    let mut columns: BTreeMap<String, FeatureColumn> = BTreeMap::new();

    for (index, bytes) in examples.iter().enumerate() {
        let example = example_codec::deserialize(bytes)?;
        let features = example.features.map(|f| f.feature).unwrap_or_default();

        if index > 0 && features.len() != columns.len() {
            return Err(BackendError::Allocation {
                reason: format!(
                    "example {} has {} features, expected {}",
                    index,
                    features.len(),
                    columns.len()
                ),
            });
        }

        for (name, value) in &features {
            let Some(kind) = value.kind.as_ref() else {
                return Err(BackendError::Allocation {
                    reason: format!("feature {} has no value list", name),
                });
            };
            if index == 0 {
                columns.insert(name.clone(), FeatureColumn::empty_like(kind));
            }
            let column = columns.get_mut(name).ok_or_else(|| BackendError::Allocation {
                reason: format!("example {} introduces unknown feature {}", index, name),
            })?;
            column.push(name, kind)?;
        }
    }

    if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != examples.len()) {
        return Err(BackendError::Allocation {
            reason: format!("feature {} is missing from some examples", name),
        });
    }

    Ok(OnnxExampleBatch {
        batch_size: examples.len(),
        columns,
    })
}

/// Scoring backend over an ONNX Runtime session.
pub struct OnnxScoringBackend {
    // ort requires exclusive access to run a session
    session: Mutex<Session>,
}

impl OnnxScoringBackend {
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, BackendError> {
        let unavailable = || BackendError::ModelUnavailable {
            path: model_path.display().to_string(),
        };

        if !model_path.is_file() {
            warn!("ONNX model file not found at {:?}", model_path);
            return Err(unavailable());
        }

        let load_failed = |reason: String| {
            error!("Failed to load ONNX model: {}", reason);
            unavailable()
        };

        let session = Session::builder()
            .map_err(|e| load_failed(e.to_string()))?
            .with_intra_threads(intra_threads)
            .map_err(|e| load_failed(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| load_failed(e.to_string()))?;

        info!("Successfully loaded ONNX model from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl ScoringBackend for OnnxScoringBackend {
    type Input = OnnxExampleBatch;
    type Output = Vec<f32>;

    const BINDS_INPUT_NODE: bool = false;

    fn example_batch(&self, examples: &[Vec<u8>]) -> Result<OnnxExampleBatch, BackendError> {
        expand_examples(examples)
    }

    fn run(
        &self,
        input_node: &str,
        input: &OnnxExampleBatch,
        output_node: &str,
    ) -> Result<Vec<f32>, BackendError> {
        debug!(
            ignored_input_node = input_node,
            features = input.columns.len(),
            "Feeding example batch as per-feature inputs"
        );

        let feeds = input
            .columns
            .iter()
            .map(|(name, column)| Ok((name.clone(), column.to_value(input.batch_size)?)))
            .collect::<Result<Vec<(String, DynValue)>, BackendError>>()?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| BackendError::Invocation {
                reason: format!("Session lock poisoned: {}", e),
            })?;

        let outputs = session.run(feeds).map_err(|e| BackendError::Invocation {
            reason: e.to_string(),
        })?;

        let output_value = outputs
            .iter()
            .find(|(name, _)| *name == output_node)
            .map(|(_, v)| v)
            .ok_or_else(|| BackendError::MissingOutput {
                node: output_node.to_string(),
            })?;

        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| BackendError::Invocation {
                reason: e.to_string(),
            })?;
        Ok(data.1.to_vec())
    }

    fn scalars(&self, output: &Vec<f32>) -> Result<Vec<f32>, BackendError> {
        Ok(output.clone())
    }

    fn name(&self) -> &str {
        "ONNX Runtime"
    }
}
