//! Model runtime interfaces.
//!
//! The inference session only knows how to load a model once and run it; the
//! runtime behind it is supplied through [`ModelLoader`]. The ONNX Runtime
//! implementation lives in [`onnx`], and tests substitute in-memory fakes.

#[cfg(feature = "onnx")]
pub mod onnx;

use crate::encoder::InputTensor;

/// A loaded model that maps one input tensor to one raw score per class.
///
/// Implementations must be safe to call from several threads at once. A
/// runtime that cannot run concurrently serialises calls internally.
pub trait Model: Send + Sync + 'static {
    /// Error type returned when inference fails.
    ///
    /// Errors must be `Send + Sync + 'static` so they can cross threads and be
    /// boxed by the session.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to evaluate the model.
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error>;
}

/// Produces a [`Model`], typically by provisioning and parsing model weights.
pub trait ModelLoader: Send + Sync {
    /// Model produced by a successful load.
    type Model: Model;
    /// Error type returned when loading fails.
    ///
    /// A load failure is shared by every caller waiting on it, so errors must
    /// be `Send + Sync + 'static`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the model. Expected to be expensive; callers load at most once.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be obtained or parsed.
    fn load(&self) -> Result<Self::Model, Self::Error>;
}
