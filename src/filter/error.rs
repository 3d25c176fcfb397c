use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),

    #[error("Invalid sort order: {0}")]
    InvalidOrder(String),

    #[error("Invalid _start: {0}")]
    InvalidOffset(String),

    #[error("Invalid _end: {0}")]
    InvalidLimit(String),
}

impl FilterError {
    /// Query parameter the error refers to.
    pub fn parameter(&self) -> &'static str {
        match self {
            FilterError::InvalidSortField(_) => "_sort",
            FilterError::InvalidOrder(_) => "_order",
            FilterError::InvalidOffset(_) => "_start",
            FilterError::InvalidLimit(_) => "_end",
        }
    }
}
