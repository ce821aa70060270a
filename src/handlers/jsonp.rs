use crate::Result;
use crate::error::ErrorBody;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Turn a handler result into a response, wrapping it as JSONP when the
/// client passed a `callback`.
pub fn respond<T: Serialize>(callback: Option<String>, result: Result<T>) -> Response {
    let Some(callback) = callback.filter(|c| !c.is_empty()) else {
        return match result {
            Ok(body) => Json(body).into_response(),
            Err(e) => e.into_response(),
        };
    };

    if !is_valid_callback(&callback) {
        return crate::Error::InvalidInput(format!("invalid callback name: {}", callback))
            .into_response();
    }

    let (status, json) = match &result {
        Ok(body) => (StatusCode::OK, serde_json::to_string(body)),
        Err(e) => (e.status_code(), serde_json::to_string(&ErrorBody::from(e))),
    };

    match json {
        Ok(json) => (
            status,
            [(header::CONTENT_TYPE, "application/javascript")],
            format!("{}({})", callback, json),
        )
            .into_response(),
        Err(e) => crate::Error::Internal(e.to_string()).into_response(),
    }
}

/// Callback names are restricted to dotted JavaScript identifiers.
fn is_valid_callback(callback: &str) -> bool {
    callback.len() <= 128
        && callback.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_names() {
        assert!(is_valid_callback("cb"));
        assert!(is_valid_callback("jQuery123_456"));
        assert!(is_valid_callback("window.app.cb"));
        assert!(!is_valid_callback("alert(1)"));
        assert!(!is_valid_callback("1abc"));
        assert!(!is_valid_callback("a..b"));
    }
}
