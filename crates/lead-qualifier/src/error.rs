use crate::config::ConfigError;
use crate::integrations::IntegrationError;
use crate::telemetry::TelemetryError;
use crate::workflows::import::IntakeImportError;
use crate::workflows::intake::{JurisdictionError, ProcessingError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(IntakeImportError),
    Processing(ProcessingError),
    Jurisdiction(JurisdictionError),
    Integration(IntegrationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Processing(err) => write!(f, "processing error: {}", err),
            AppError::Jurisdiction(err) => write!(f, "jurisdiction error: {}", err),
            AppError::Integration(err) => write!(f, "integration error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Processing(err) => Some(err),
            AppError::Jurisdiction(err) => Some(err),
            AppError::Integration(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Jurisdiction(JurisdictionError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Processing(_)
            | AppError::Jurisdiction(_)
            | AppError::Integration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IntakeImportError> for AppError {
    fn from(value: IntakeImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ProcessingError> for AppError {
    fn from(value: ProcessingError) -> Self {
        Self::Processing(value)
    }
}

impl From<JurisdictionError> for AppError {
    fn from(value: JurisdictionError) -> Self {
        Self::Jurisdiction(value)
    }
}

impl From<IntegrationError> for AppError {
    fn from(value: IntegrationError) -> Self {
        Self::Integration(value)
    }
}
