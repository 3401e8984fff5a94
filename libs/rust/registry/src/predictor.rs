use crate::frame::Frame;

/// A loaded model's inference function.
///
/// Implementations are shared across request handlers, so `predict` takes
/// `&self` and must be safe to call concurrently. Returns one value per row
/// (for multi-output models, the first output flattened).
pub trait Predictor: Send + Sync {
    fn predict(&self, frame: &Frame) -> anyhow::Result<Vec<f64>>;
}
