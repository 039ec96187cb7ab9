use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

use crate::http::AppError;

/// JSON request body whose rejections render as `{"error": ...}` like every other failure.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::bad_request("request body must be JSON")
        }
        JsonRejection::JsonSyntaxError(_) => AppError::bad_request("malformed JSON body"),
        JsonRejection::JsonDataError(err) => {
            AppError::bad_request(format!("invalid request body: {}", err.body_text()))
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::payload_too_large("request body too large")
        }
        other => {
            tracing::debug!(error = %other.body_text(), "failed to read request body");
            AppError::bad_request("failed to read request body")
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

/// Id field that accepts a JSON number or a numeric string. Null and blank strings are absent.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IdValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IdValue::Number(id)) => Ok(Some(id)),
        Some(IdValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid id: {:?}", text)))
        }
    }
}
