pub mod decode;
pub mod detector;
pub mod face;
pub mod model;
pub mod yunet;

// Re-export commonly used types
pub use decode::{FileDecoder, ImageDecoder};
pub use detector::{FaceDetector, YuNetDetector};
pub use face::{Detection, FaceRect};
