use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use validator::Validate;

use crate::error::MedlensError;

/// `Json` whose rejections use the service's error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(MedlensError))]
pub struct AppJson<T>(pub T);

/// [`AppJson`] followed by `validator` checks.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Validate,
    AppJson<T>: FromRequest<S, Rejection = MedlensError>,
{
    type Rejection = MedlensError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|errors| MedlensError::Validation(validation_message(&errors)))?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for MedlensError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> MedlensError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                MedlensError::Validation(format!("Missing required field: {field}"))
            } else {
                MedlensError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            MedlensError::Validation(format!("JSON syntax error: {err}"))
        }
        JsonRejection::MissingJsonContentType(_) => MedlensError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(_) => {
            MedlensError::Internal("Failed to read request body".to_string())
        }
        _ => MedlensError::Validation(rejection.to_string()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

/// First message of each failing field, sorted by field name.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().take(1).map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Multipart read failures. A body over the transport cap is reported with
/// the same message as an oversized file.
pub fn map_multipart_error(error: MultipartError, too_large_message: &str) -> MedlensError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MedlensError::Validation(too_large_message.to_string())
    } else {
        MedlensError::Validation(format!("Invalid multipart body: {}", error.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        assert_eq!(
            extract_missing_field("Failed to deserialize: missing field `message` at line 1"),
            Some("message")
        );
        assert_eq!(extract_missing_field("something else"), None);
    }
}
