use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("function `{0}` is defined more than once")]
    DuplicateDefinition(String),

    #[error("malformed function name `{0}`")]
    MalformedName(String),

    #[error("function `{0}` not found")]
    NotFound(String),

    #[error("argument `{parameter}`: {source}")]
    InvalidArgument {
        parameter: String,
        #[source]
        source: flowgraph_core::ValueError,
    },

    #[error("invalid search pattern")]
    Pattern(#[from] regex::Error),
}
