//! Archive I/O error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed delimited text inside an archive entry.
    #[error("parse error in {file}{}: {message}", at_line(.line))]
    Parse {
        file: String,
        line: Option<u64>,
        message: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] gtfsflow_store::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn at_line(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl Error {
    /// Wrap a csv failure raised while reading `file`.
    pub fn parse(file: &str, err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        Error::Parse {
            file: file.to_string(),
            line,
            message: err.to_string(),
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                vec!["check that the input path exists".into()]
            }
            Error::Zip(_) => vec!["check that the input is a readable zip archive".into()],
            Error::Parse { .. } => vec![
                "check the entry is UTF-8 delimited text with a header row".into(),
                "fields containing commas or quotes must be quoted".into(),
            ],
            Error::Store(e) if e.is_constraint() => vec![
                "a referenced identifier is missing from the feed".into(),
            ],
            Error::Context { source, .. } => source.suggestions(),
            _ => Vec::new(),
        }
    }
}
