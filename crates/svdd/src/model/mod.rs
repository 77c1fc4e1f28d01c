//! Model components: the embedder seam, its default MLP implementation, and
//! the tensor bridge between plain vectors and burn tensors.

pub mod bridge;
pub mod embedder;
