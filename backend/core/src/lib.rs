pub mod credentials;
pub mod error;
pub mod frame;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::{ErrorKind, QuillError};
pub use frame::{ChatFrame, ReplyFrame, STATUS_CONTINUING, STATUS_FINAL};
pub use traits::{DocumentRecognizer, EssayChecker, RecordSink};
pub use types::{
    default_grammar_errors, default_suggestions, CorrectionResult, DetailedError, ImageFormat,
    SourceType, DEFAULT_GRAMMAR_ERRORS, DEFAULT_SUGGESTIONS, MAX_DETAILED_ERRORS,
    MAX_GRAMMAR_ERRORS, MAX_SUGGESTIONS,
};
