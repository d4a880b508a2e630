use crate::collection::Document;
use crate::common::{Value, DOC_ID};

/// Creates a fluent filter builder for the specified field name.
///
/// The builder produces plain filter documents, the same ones a caller could
/// write by hand with `doc!`:
///
/// ```rust
/// use docsql::doc;
/// use docsql::filter::field;
///
/// assert_eq!(field("age").gt(20), doc!{ age: { gt: 20 } });
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// A filter matching every document.
pub fn all() -> Document {
    Document::new()
}

/// A filter matching the document whose identity field equals `id`.
pub fn by_id<T: Into<Value>>(id: T) -> Document {
    let mut filter = Document::new();
    filter.insert(DOC_ID, id.into());
    filter
}

/// Combines filters with a logical AND.
pub fn and(filters: Vec<Document>) -> Document {
    combinator("and", filters)
}

/// Combines filters with a logical OR.
pub fn or(filters: Vec<Document>) -> Document {
    combinator("or", filters)
}

/// Matches documents matching none of the filters.
pub fn nor(filters: Vec<Document>) -> Document {
    combinator("nor", filters)
}

/// Negates a filter.
pub fn not(filter: Document) -> Document {
    let mut negated = Document::new();
    negated.insert("not", Value::Document(filter));
    negated
}

fn combinator(name: &str, filters: Vec<Document>) -> Document {
    let mut combined = Document::new();
    combined.insert(
        name,
        Value::Array(filters.into_iter().map(Value::Document).collect()),
    );
    combined
}

/// A fluent builder for filters on a single field.
///
/// Each method consumes the builder and returns the filter document.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    /// Matches documents where the field equals `value`. A null value matches
    /// documents where the field is null or absent.
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Document {
        let mut filter = Document::new();
        filter.insert(self.field_name, value.into());
        filter
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Document {
        self.operator("ne", value.into())
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Document {
        self.operator("gt", value.into())
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Document {
        self.operator("gte", value.into())
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Document {
        self.operator("lt", value.into())
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Document {
        self.operator("lte", value.into())
    }

    /// Matches documents where the field lies in the closed interval
    /// `[lower_bound, upper_bound]`.
    pub fn between<T: Into<Value>>(self, lower_bound: T, upper_bound: T) -> Document {
        let mut operators = Document::new();
        operators.insert("gte", lower_bound.into());
        operators.insert("lte", upper_bound.into());

        let mut filter = Document::new();
        filter.insert(self.field_name, Value::Document(operators));
        filter
    }

    /// Matches documents where the field equals one of `values`.
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Document {
        self.operator("in", Value::from_vec(values))
    }

    /// Matches documents where the field equals none of `values`.
    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Document {
        self.operator("nin", Value::from_vec(values))
    }

    /// Matches documents where the field is present and not null, or, with
    /// `false`, where it is absent or null.
    pub fn exists(self, exists: bool) -> Document {
        self.operator("exists", Value::Bool(exists))
    }

    fn operator(self, name: &str, operand: Value) -> Document {
        let mut operators = Document::new();
        operators.insert(name, operand);

        let mut filter = Document::new();
        filter.insert(self.field_name, Value::Document(operators));
        filter
    }
}
