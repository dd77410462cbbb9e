use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Internal,
}

/// Wire shape of an error body returned by the backend API, also carried in
/// the `error` event on the session stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_decode_from_snake_case() {
        let decoded: ApiError = serde_json::from_value(serde_json::json!({
            "code": "unauthorized",
            "message": "session expired",
        }))
        .expect("decode");

        assert_eq!(decoded.code, ErrorCode::Unauthorized);
        assert_eq!(decoded.message, "session expired");
    }

    #[test]
    fn error_bodies_encode_with_snake_case_codes() {
        let encoded =
            serde_json::to_value(ApiError::new(ErrorCode::NotFound, "no such message"))
                .expect("encode");

        assert_eq!(encoded["code"], "not_found");
        assert_eq!(encoded["message"], "no such message");
    }
}
