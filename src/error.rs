use crate::models::CategoryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikicatError {
    #[error("category not found: {title} ({language})")]
    CategoryNotFound { title: String, language: String },

    #[error("malformed persisted state: {0}")]
    MalformedPersistedState(String),

    #[error("category {0} has no resolved name")]
    UnnamedNode(CategoryId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, WikicatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WikicatError::CategoryNotFound {
            title: "Category:Contents".into(),
            language: "de".into(),
        };
        assert_eq!(err.to_string(), "category not found: Category:Contents (de)");
        assert!(WikicatError::UnnamedNode(7).to_string().contains('7'));
    }
}
