use std::env;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    NotFound,
    BadRequest,
    Forbidden,
    Internal,
}

/// Crate-wide error. `NotFound`, `BadRequest` and `Forbidden` are terminal
/// client errors surfaced verbatim; `Internal` wraps store/policy/config
/// failures so callers can tell a broken rule from a broken system.
#[derive(Debug)]
pub struct Error {
    pub kind: Kind,
    pub message: String,
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: Kind::NotFound,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: Kind::BadRequest,
            message: message.into(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            kind: Kind::Forbidden,
            message: "forbidden".into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: Kind::Internal,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == Kind::NotFound
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind == Kind::BadRequest
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == Kind::Forbidden
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(format!("database error: {}", err))
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        Self::internal(format!("policy error: {}", err))
    }
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        Self::internal(format!("environment variable error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_carry_their_message() {
        let err = Error::bad_request("Trip cannot be cancelled");

        assert!(err.is_bad_request());
        assert_eq!(err.to_string(), "Trip cannot be cancelled");
    }

    #[test]
    fn store_failures_are_not_client_errors() {
        let err = Error::from(sqlx::Error::RowNotFound);

        assert_eq!(err.kind, Kind::Internal);
        assert!(!err.is_not_found());
        assert!(!err.is_bad_request());
    }
}
