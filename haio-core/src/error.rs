use thiserror::Error;

/// The error taxonomy shared by every `haio` crate.
///
/// Variant names reflect the *condition* that was detected, not the
/// Rust type that carried it, so that callers can match on them the
/// same way the original engine's exception names could be matched on.
#[derive(Debug, Error)]
pub enum HaioError {
    /// A question template contains an unknown node tag, an unknown
    /// answer type, or a `Select` answer with empty/duplicate options.
    #[error("invalid question: {reason}")]
    InvalidQuestion { reason: String },

    /// `config.client` does not name a worker registered for the
    /// chosen method.
    #[error("invalid client '{client}': no worker of this kind is registered")]
    InvalidClient { client: String },

    /// A batch of asks did not all share the same question template.
    #[error("all asks in a batch must share the same question template (ask {index} differs)")]
    MixedTemplates { index: usize },

    /// `config.method` does not name a known execution policy.
    #[error("invalid method '{method}'")]
    InvalidMethod { method: String },

    /// A numeric parameter (`q`, `alpha`, `iteration`, `sample_size`) was
    /// out of its valid range, or a `Select`-only method was invoked
    /// against a non-`Select` template.
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// A single-shot worker received a second `submit` for a question
    /// fingerprint whose prior answer has not yet been taken.
    #[error("worker is already asking question {fingerprint}")]
    AlreadyAsking { fingerprint: String },

    /// `take`/`is_done` referenced a handle the worker never issued (or
    /// whose answer was already taken).
    #[error("handle '{handle}' was never asked or was already taken")]
    NeverAsked { handle: String },

    /// A worker produced no content at all.
    #[error("worker '{worker}' returned an empty response")]
    EmptyResponse { worker: String },

    /// A human delivery was parsed but carried no answer field.
    #[error("human delivery for handle '{handle}' carried no answer")]
    MissingAnswer { handle: String },

    /// Cache file I/O failed.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Cache file contents failed to (de)serialise.
    #[error("cache (de)serialisation error at {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, HaioError>;
