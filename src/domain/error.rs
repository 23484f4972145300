use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{value}` is not a valid post key")]
    InvalidPostKey { value: String },
    #[error("`{value}` is not a valid page number")]
    InvalidPage { value: String },
}

impl DomainError {
    pub fn invalid_post_key(value: impl Into<String>) -> Self {
        Self::InvalidPostKey {
            value: value.into(),
        }
    }

    pub fn invalid_page(value: impl Into<String>) -> Self {
        Self::InvalidPage {
            value: value.into(),
        }
    }
}
