use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Required input table '{table}' is missing")]
    MissingInput { table: &'static str },

    #[error("Required input table '{table}' is empty")]
    EmptyInput { table: &'static str },

    #[error("Unparseable timestamp '{value}' in table '{table}'")]
    BadTimestamp { table: &'static str, value: String },

    #[error("Stage '{stage}' failed building table '{table}': {source}")]
    StageFailed {
        stage: &'static str,
        table: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
