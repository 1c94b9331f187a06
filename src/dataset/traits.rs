use crate::error::DatasetError;
use crate::types::Batch;

/// Index-addressable, lazily materialized collection.
///
/// Items are produced only when requested and the dataset is never mutated
/// after construction, so `get` may be driven from several threads at once.
pub trait Dataset: Send + Sync {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Self::Item, DatasetError>;

    fn collate(&self, items: Vec<Self::Item>) -> Result<Batch, DatasetError>;
}
