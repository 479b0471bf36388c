//! Label enumeration and classification results

mod label;
mod result;

pub use label::Label;
pub use result::ClassificationResult;
