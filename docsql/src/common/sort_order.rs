/// Specifies the direction for sorting documents.
///
/// Used by [FindOptions](crate::collection::FindOptions), the `sort` pipeline
/// stage and cursor pagination. A sort direction of `-1` in a pipeline maps to
/// [SortOrder::Descending], any other number to [SortOrder::Ascending].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A)
    Descending,
}

impl SortOrder {
    /// The SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// Maps a numeric sort direction, negative meaning descending.
    pub fn from_direction(direction: f64) -> SortOrder {
        if direction < 0.0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}
