use crate::error::AppError;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: &'static str,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error",
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub trait ToValidationResponse {
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>>;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>> {
        self.log_and_record("API Validation Error");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(db_err) => ("database", format!("Database error: {}", db_err)),
            AppError::Authentication(msg) => {
                ("authentication", format!("Authentication error: {}", msg))
            }
            AppError::Forbidden(msg) => ("permission", format!("Permission denied: {}", msg)),
            AppError::NotFound(msg) => ("resource", format!("Not found: {}", msg)),
            AppError::InvalidRole(msg) => ("role", format!("Invalid role: {}", msg)),
            AppError::OutOfRange(msg) => ("points", format!("Out of range: {}", msg)),
            AppError::UnknownReference(msg) => ("reference", format!("Unknown reference: {}", msg)),
            AppError::Validation(msg) => ("validation", msg.clone()),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for validator::ValidationErrors {
    #[instrument]
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>> {
        let mut error_map = HashMap::new();

        for (field, field_errors) in self.field_errors() {
            let error_messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();

            error_map.insert(field.to_string(), error_messages);
        }

        Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::new(error_map)),
        )
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>> {
        let (field, message) = if self == Status::Forbidden {
            (
                "permission",
                "You don't have permission to perform this action",
            )
        } else if self == Status::Unauthorized {
            ("authentication", "Authentication required")
        } else if self == Status::NotFound {
            ("resource", "Resource not found")
        } else if self == Status::Conflict {
            ("resource", "Resource already exists")
        } else if self == Status::BadRequest {
            ("request", "Bad request")
        } else if self == Status::UnprocessableEntity {
            ("validation", "Validation failed")
        } else if self == Status::InternalServerError {
            ("server", "Internal server error")
        } else if self == Status::ServiceUnavailable {
            ("service", "Service unavailable")
        } else {
            ("error", "An error occurred")
        };

        Custom(self, Json(ValidationResponse::with_error(field, message)))
    }
}

/// Deserialize-then-validate for JSON request bodies, collapsing field errors
/// into the standard validation envelope.
pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>> {
        let inner = self.into_inner();
        match inner.validate() {
            Ok(()) => Ok(inner),
            Err(errors) => Err(errors.to_validation_response()),
        }
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>> {
        self.map_err(|err| err.to_validation_response())
    }
}

pub trait PermissionCheckExt<T> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>>;
}

impl<T> PermissionCheckExt<T> for Result<T, Status> {
    fn validate_custom(self) -> Result<T, Custom<Json<ValidationResponse>>> {
        self.map_err(|status| status.to_validation_response())
    }
}
