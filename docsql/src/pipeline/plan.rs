use crate::collection::Document;
use crate::common::Value;
use crate::errors::DocResult;

/// The shape of the rows an [ExecutionPlan]'s statement returns.
///
/// Both shapes expose the document blob in the `doc` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `id, doc` rows holding stored documents.
    Documents,
    /// One `doc` row per group, holding `_id` and the accumulators.
    Grouped,
}

/// A stage applied in memory after the statement executes.
#[derive(Debug, Clone, PartialEq)]
pub enum PostStage {
    Project(Vec<String>),
    Unwind(String),
}

/// A compiled pipeline: one SQL statement, its parameters and the in-memory
/// stages to run over the decoded rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub sql: String,
    pub params: Vec<Value>,
    pub shape: ResultShape,
    pub post_stages: Vec<PostStage>,
}

impl ExecutionPlan {
    /// Runs the post-SQL stages, in pipeline order, over decoded documents.
    pub fn apply_post_stages(&self, documents: Vec<Document>) -> DocResult<Vec<Document>> {
        let mut documents = documents;
        for stage in &self.post_stages {
            documents = match stage {
                PostStage::Project(fields) => documents
                    .iter()
                    .map(|document| project(document, fields))
                    .collect::<DocResult<Vec<_>>>()?,
                PostStage::Unwind(path) => {
                    let mut unwound = Vec::with_capacity(documents.len());
                    for document in documents {
                        unwind(document, path, &mut unwound)?;
                    }
                    unwound
                }
            };
        }
        Ok(documents)
    }
}

/// Keeps only `fields`, in the order they are listed.
pub fn project(document: &Document, fields: &[String]) -> DocResult<Document> {
    let mut projected = Document::new();
    for field in fields {
        if let Some(value) = document.get(field) {
            projected.put(field.as_str(), value.clone())?;
        }
    }
    Ok(projected)
}

/// Emits one document per element of the sequence at `path`, or the
/// document itself when `path` does not hold a sequence.
pub fn unwind(document: Document, path: &str, output: &mut Vec<Document>) -> DocResult<()> {
    let elements = match document.get(path) {
        Some(Value::Array(elements)) => elements.clone(),
        _ => {
            output.push(document);
            return Ok(());
        }
    };

    for element in elements {
        let mut copy = document.clone();
        if copy.contains_key(path) {
            copy.insert(path, element);
        } else {
            copy.put(path, element)?;
        }
        output.push(copy);
    }
    Ok(())
}
