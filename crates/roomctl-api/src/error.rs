//! Response envelope and error mapping for the control plane.
//!
//! Every response has the shape `{success, data}` or
//! `{success: false, code, message}`. Domain errors map to codes as follows:
//!
//! | Error                                   | Status | Code                 |
//! |-----------------------------------------|--------|----------------------|
//! | `DeviceNotFound`, `ModuleUnavailable`   | 404    | `<CLASS>_NOT_FOUND`  |
//! | `InvalidParameter { field }`            | 400    | `INVALID_<FIELD>`    |
//! | body number not a whole `i32`           | 400    | `INVALID_<FIELD>`    |
//! | malformed request body                  | 400    | `INVALID_REQUEST`    |
//! | anything else                           | 500    | `INTERNAL_ERROR`     |

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roomctl_core::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, json};

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap `data` in a success envelope.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String) {
        match self {
            Self::Domain(Error::DeviceNotFound { kind, .. } | Error::ModuleUnavailable(kind)) => {
                (StatusCode::NOT_FOUND, kind.not_found_code().to_string())
            }
            Self::Domain(Error::InvalidParameter { field, .. }) => (
                StatusCode::BAD_REQUEST,
                format!("INVALID_{}", field.to_ascii_uppercase()),
            ),
            Self::Domain(Error::InvalidDeviceId(_)) | Self::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string())
            }
            Self::Domain(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code = %code, error = ?self, "Request failed");
        } else {
            tracing::warn!(status = %status, code = %code, message = %message, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "code": code,
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// JSON body extractor whose rejections use the API envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Parse an optional JSON body: empty means `None`.
pub fn optional_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

/// Narrow a body number to `i32`.
///
/// Fractions and magnitudes past `i32` are rejected as the field, not as a
/// malformed body, so clients see the same code as for any other bad level.
pub fn whole_number(field: &'static str, value: &Number) -> Result<i32, ApiError> {
    let Some(wide) = value.as_i64() else {
        return Err(Error::invalid(field, format!("must be a whole number, got {value}")).into());
    };
    i32::try_from(wide)
        .map_err(|_| Error::invalid(field, format!("out of range, got {value}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomctl_core::ModuleKind;
    use rstest::rstest;

    #[rstest]
    #[case(Error::not_found(ModuleKind::Display, "x"), 404, "DISPLAY_NOT_FOUND")]
    #[case(Error::ModuleUnavailable(ModuleKind::Lighting), 404, "LIGHTING_NOT_FOUND")]
    #[case(Error::not_found(ModuleKind::Codec, "x"), 404, "BIAMP_NOT_FOUND")]
    #[case(Error::invalid("brightness", "101"), 400, "INVALID_BRIGHTNESS")]
    #[case(Error::invalid("red", "256"), 400, "INVALID_RED")]
    #[case(Error::transport("device rebooting"), 500, "INTERNAL_ERROR")]
    #[case(Error::Timeout(3000), 500, "INTERNAL_ERROR")]
    fn test_error_codes(#[case] error: Error, #[case] status: u16, #[case] code: &str) {
        let (actual_status, actual_code) = ApiError::from(error).parts();
        assert_eq!(actual_status.as_u16(), status);
        assert_eq!(actual_code, code);
    }

    #[rstest]
    #[case("3000000000")]
    #[case("-3000000000")]
    #[case("50.5")]
    #[case("1e30")]
    #[case("18446744073709551615")]
    fn test_whole_number_rejects_as_field(#[case] raw: &str) {
        let value: Number = serde_json::from_str(raw).unwrap();
        let (status, code) = whole_number("brightness", &value).unwrap_err().parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_BRIGHTNESS");
    }

    #[rstest]
    #[case("0", 0)]
    #[case("-5", -5)]
    #[case("101", 101)]
    #[case("2147483647", i32::MAX)]
    fn test_whole_number_passes_integers(#[case] raw: &str, #[case] expected: i32) {
        let value: Number = serde_json::from_str(raw).unwrap();
        assert_eq!(whole_number("volume", &value).unwrap(), expected);
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Step {
        step: i32,
    }

    #[rstest]
    #[case(b"", None)]
    #[case(b"  \n", None)]
    #[case(b"{\"step\": 10}", Some(Step { step: 10 }))]
    fn test_optional_body(#[case] body: &[u8], #[case] expected: Option<Step>) {
        assert_eq!(optional_body::<Step>(body).unwrap(), expected);
    }

    #[test]
    fn test_malformed_optional_body() {
        assert!(matches!(
            optional_body::<Step>(b"{\"step\":"),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
