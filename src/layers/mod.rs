//! Neural Network Layers
//!
//! The building blocks of the pipeline, in the order data flows through them.
//!
//! ## Layers
//!
//! - **attention**: Scaled dot-product self-attention (single head)
//! - **feed_forward**: Two-layer network with ReLU, plus the output head
//! - **activation**: ReLU
//! - **layer_norm**: Parameter-free per-row normalisation
//!
//! ## Design Pattern
//!
//! Every layer owns its weights and exposes a pure forward pass:
//!
//! ```rust,ignore
//! pub struct Layer {
//!     // Parameters (weights, biases, etc.)
//! }
//!
//! impl Layer {
//!     pub fn new(...) -> Self { }
//!     pub fn forward(&self, x: &Tensor) -> Tensor { }
//!     pub fn load(dir: &Path, ...) -> Result<Self> { }
//!     pub fn save(&self, dir: &Path) -> Result<()> { }
//! }
//! ```
//!
//! Training never builds a backward graph. Weights are public and the update
//! rules in [`crate::backprop`] act on them directly.

pub mod activation;
pub mod attention;
pub mod feed_forward;
pub mod layer_norm;

// Re-export main types for convenience
pub use activation::{relu, relu_in_place};
pub use attention::SelfAttention;
pub use feed_forward::{FeedForward, OutputHead};
pub use layer_norm::LayerNorm;
