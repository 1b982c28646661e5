pub mod config;
pub mod events;
pub mod filter;
pub mod output;

// Re-export vision types for convenience
pub use facesift_vision::{
    FaceDetector, FaceRect, FileDecoder, ImageDecoder, YuNetDetector,
};
pub use filter::{FaceFilter, RunSummary};
