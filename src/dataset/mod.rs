pub mod manifest;
pub mod sequence;
pub mod traits;

pub use manifest::ManifestDataset;
pub use sequence::SequenceDataset;
pub use traits::Dataset;
