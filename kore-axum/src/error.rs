use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kore_core::{KoreError, TenancyError};

#[derive(Debug)]
pub struct KoreAxumError(pub anyhow::Error);

impl From<anyhow::Error> for KoreAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<TenancyError> for KoreAxumError {
    fn from(e: TenancyError) -> Self {
        Self(KoreError::from(e).into_anyhow())
    }
}

impl From<KoreError> for KoreAxumError {
    fn from(e: KoreError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for KoreAxumError {
    fn into_response(self) -> Response {
        // KoreError and TenancyError keep their Feathers-ish fields; anything
        // else becomes a GeneralError.
        let kore = KoreError::normalize(self.0);
        if kore.code() >= 500 {
            tracing::error!(error = %kore, source = ?kore.source, "request failed");
        }

        let safe = kore.sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
