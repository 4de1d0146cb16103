use crate::domain::errors::BackendError;

/// Names of the graph nodes a scoring model is invoked through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSignature {
    /// Node accepting a batch of serialized examples
    pub input_node: String,
    /// Node yielding one scalar per example
    pub output_node: String,
}

impl ModelSignature {
    pub const DEFAULT_INPUT_NODE: &'static str = "input_example_tensor";
    pub const DEFAULT_OUTPUT_NODE: &'static str = "Squeeze:0";

    pub fn new(input_node: impl Into<String>, output_node: impl Into<String>) -> Self {
        Self {
            input_node: input_node.into(),
            output_node: output_node.into(),
        }
    }
}

impl Default for ModelSignature {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INPUT_NODE, Self::DEFAULT_OUTPUT_NODE)
    }
}

/// An already initialised scoring session.
///
/// Implementations are shared across threads and must support reentrant
/// calls. Tensors are call-scoped: whatever `Input` and `Output` hold on the
/// backend side is released when the value is dropped.
pub trait ScoringBackend: Send + Sync {
    type Input;
    type Output;

    /// Whether `run` binds its input to the named `input_node`. Backends that
    /// feed decoded features to their own inputs ignore the node name.
    const BINDS_INPUT_NODE: bool = true;

    /// Allocates the input tensor for a batch of serialized examples.
    fn example_batch(&self, examples: &[Vec<u8>]) -> Result<Self::Input, BackendError>;

    /// Runs the graph, feeding `input` to `input_node` and fetching only `output_node`.
    fn run(
        &self,
        input_node: &str,
        input: &Self::Input,
        output_node: &str,
    ) -> Result<Self::Output, BackendError>;

    /// Copies the output tensor out as flat `f32` values.
    fn scalars(&self, output: &Self::Output) -> Result<Vec<f32>, BackendError>;

    /// Get backend name/type
    fn name(&self) -> &str;
}
