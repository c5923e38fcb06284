use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed answered with status {0}")]
    Status(u16),
    #[error("feed has {lines} lines, no line {wanted} from the end")]
    MissingLine { lines: usize, wanted: usize },
    #[error("line has nothing at columns {start}..{end}: {line:?}")]
    ShortLine {
        start: usize,
        end: usize,
        line: String,
    },
    #[error("not a number: {0:?}")]
    NotANumber(String),
}
