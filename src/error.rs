use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to load release configuration {resource}: {message}")]
    ConfigResourceUnreachable { resource: String, message: String },

    #[error("unable to find release(s) {}; available: {}", .missing.join(", "), .available.join(", "))]
    UnresolvedRelease {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("unable to find species {}; available: {}", .missing.join(", "), .available.join(", "))]
    UnresolvedSpecies {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("record stream failed for version {version} species {species}: {message}")]
    RecordStream {
        version: String,
        species: String,
        message: String,
    },

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(u64),

    #[error("unable to find version \"{version}\" and species \"{species}\"")]
    StoreNotFound { version: String, species: String },

    #[error("no ids were passed in")]
    EmptyQuery,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl Error {
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::ConfigResourceUnreachable { .. } => "ConfigResourceUnreachable",
            Error::UnresolvedRelease { .. } | Error::UnresolvedSpecies { .. } => {
                "UnresolvedReleaseOrSpecies"
            }
            Error::RecordStream { .. } => "RecordStreamFailure",
            Error::InvalidRegion(_) => "InvalidRegion",
            Error::InvalidCoordinate(_) => "InvalidCoordinate",
            Error::StoreNotFound { .. } => "StoreNotFound",
            Error::EmptyQuery => "EmptyQuery",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Database(_) | Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRegion(_)
            | Error::InvalidCoordinate(_)
            | Error::EmptyQuery
            | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::StoreNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConfigResourceUnreachable { .. }
            | Error::UnresolvedRelease { .. }
            | Error::UnresolvedSpecies { .. }
            | Error::RecordStream { .. }
            | Error::Database(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            error: err.error_type(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self);
        (self.status_code(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_are_bad_request() {
        assert_eq!(
            Error::InvalidRegion("".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::EmptyQuery.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InvalidCoordinate(0).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_not_found_is_404() {
        let err = Error::StoreNotFound {
            version: "91".to_string(),
            species: "Mm".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "StoreNotFound");
        assert!(err.to_string().contains("\"91\""));
    }

    #[test]
    fn test_unresolved_release_lists_alternatives() {
        let err = Error::UnresolvedRelease {
            missing: vec!["12".to_string()],
            available: vec!["90".to_string(), "91".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("12"));
        assert!(message.contains("90, 91"));
    }
}
