use crate::common::SortOrder;

/// Options shaping the result of a find: ordering, paging and projection.
///
/// Sort keys are applied in the order they were added. A projection keeps
/// only the named fields of every returned document; an empty projection
/// returns whole documents.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::collection::{order_by, FindOptions};
/// use docsql::common::SortOrder;
///
/// let options = order_by("age", SortOrder::Descending).skip(10).limit(5);
/// let options = FindOptions::new().project(&["name", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) sort_by: Vec<(String, SortOrder)>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) projection: Vec<String>,
}

/// Creates find options sorted on one field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

/// Creates find options skipping the first `skip` documents.
pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

/// Creates find options returning at most `limit` documents.
pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Adds a sort key after the ones already present.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort_by.push((field_name.to_string(), sort_order));
        self
    }

    /// Keeps only `fields` in the returned documents.
    pub fn project(mut self, fields: &[&str]) -> FindOptions {
        self.projection = fields.iter().map(|it| it.to_string()).collect();
        self
    }

    pub fn sort_fields(&self) -> &[(String, SortOrder)] {
        &self.sort_by
    }

    pub fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }
}

/// Options for [DocumentCollection::aggregate](crate::collection::DocumentCollection::aggregate).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateOptions {
    pub(crate) operator_policy: Option<crate::common::OperatorPolicy>,
}

impl AggregateOptions {
    pub fn new() -> AggregateOptions {
        AggregateOptions::default()
    }

    /// Overrides the client's operator policy for this pipeline only.
    pub fn operator_policy(mut self, policy: crate::common::OperatorPolicy) -> AggregateOptions {
        self.operator_policy = Some(policy);
        self
    }
}
