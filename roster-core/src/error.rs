use thiserror::Error;

/// Errors from the extraction engine.
///
/// Malformed model text is never an error; only a schema whose keys do not
/// line up with the target struct ends up here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("record {id} does not match its target type: {source}")]
    Conversion {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown schema: {0}")]
    UnknownSchema(String),
}
