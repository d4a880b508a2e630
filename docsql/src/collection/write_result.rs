use crate::common::Value;

/// The outcome of an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertResult {
    acknowledged: bool,
    inserted_ids: Vec<Value>,
}

impl InsertResult {
    pub fn new(inserted_ids: Vec<Value>) -> Self {
        InsertResult {
            acknowledged: true,
            inserted_ids,
        }
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// The `id` of every inserted document, in insertion order.
    pub fn inserted_ids(&self) -> &[Value] {
        &self.inserted_ids
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted_ids.len()
    }
}

/// The outcome of an update.
///
/// `matched_count` counts the rows the re-select returned; a row deleted
/// before its write still counts as matched. `modified_count` counts the
/// writes that affected a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// The outcome of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}
