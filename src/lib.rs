pub mod audio;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod dictionary;
pub mod error;
pub mod types;
pub mod upstream;

pub use config::{DataConfig, ManifestDatasetConfig, SequenceDatasetConfig};
pub use corpus::{BucketIndex, CorpusIndex};
pub use dataset::{Dataset, ManifestDataset, SequenceDataset};
pub use dictionary::{Dictionary, FinalizeOptions, LineTokenizer, WhitespaceTokenizer};
pub use error::DatasetError;
pub use types::{Batch, BucketPlan, DurationEntry, KeyReport, Sample};
pub use upstream::{customized_upstream, UpstreamExpert, UpstreamRegistry};
