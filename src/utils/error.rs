use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

lazy_static::lazy_static! {
    /// Raw diagnostics are only echoed back outside production.
    static ref EXPOSE_DETAILS: bool = std::env::var("APP_ENV")
        .map(|env| env != "production")
        .unwrap_or(true);
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or malformed input. `fields` lists every offending field.
    Validation { message: String, fields: Vec<String> },
    Unverified,
    SessionMissing,
    NotFound(String),
    Conflict(String),
    Forbidden(String),
    Persistence(String),
    ExternalService(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation { message: message.into(), fields: Vec::new() }
    }

    pub fn missing_fields(fields: Vec<String>) -> Self {
        AppError::Validation {
            message: "Missing required fields".to_string(),
            fields,
        }
    }

    pub fn invalid_fields(fields: Vec<String>) -> Self {
        AppError::Validation {
            message: "Invalid input fields".to_string(),
            fields,
        }
    }

    pub fn persistence(context: &str, err: impl fmt::Display) -> Self {
        AppError::Persistence(format!("{}: {}", context, err))
    }

    /// Short, user-facing text. Persistence and storage failures hide their cause.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::Unverified => {
                "your email is not verified yet, please login or sign up".to_string()
            }
            AppError::SessionMissing => {
                "User session not found. Please login again.".to_string()
            }
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::Forbidden(msg) => {
                msg.clone()
            }
            AppError::Persistence(_) => "A storage operation failed".to_string(),
            AppError::ExternalService(_) => "An external service call failed".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation { message, fields } if fields.is_empty() => {
                write!(f, "Validation error: {}", message)
            }
            AppError::Validation { message, fields } => {
                write!(f, "Validation error: {} ({})", message, fields.join(", "))
            }
            AppError::Unverified => write!(f, "User is not verified"),
            AppError::SessionMissing => write!(f, "Session missing"),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Persistence(msg) => write!(f, "Database error: {}", msg),
            AppError::ExternalService(msg) => write!(f, "External service error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Unverified | AppError::SessionMissing => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Persistence(_) | AppError::ExternalService(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        crate::api::metrics::increment_error_count();

        let mut body = serde_json::json!({
            "success": false,
            "error": self.public_message(),
        });

        if let AppError::Validation { fields, .. } = self {
            if !fields.is_empty() {
                body["missingFields"] = serde_json::json!(fields);
            }
        }

        if *EXPOSE_DETAILS {
            if let AppError::Persistence(detail) | AppError::ExternalService(detail) = self {
                body["details"] = serde_json::json!(detail);
            }
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::missing_fields(vec!["taxId".into()]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unverified.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::SessionMissing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Persistence("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_body_lists_fields() {
        let response = AppError::missing_fields(vec!["swiftCode".into()]).error_response();
        let bytes = response.into_body().try_into_bytes().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["missingFields"], serde_json::json!(["swiftCode"]));
    }
}
