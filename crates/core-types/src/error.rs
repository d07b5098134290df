use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Missing required value: {0}")]
    MissingValue(&'static str),
}
