//! Response classification
//!
//! Every response passes through [`classify`] before it reaches the caller.
//! Only 401s are interesting: `token.expired` is the one code that may be
//! recovered by refreshing, everything else fails closed.

use super::ClientError;
use super::transport::ApiResponse;
use crate::types::ErrorBody;
use reqwest::StatusCode;

/// Error code the API uses for an expired access token
pub const TOKEN_EXPIRED_CODE: &str = "token.expired";

/// What to do with a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// 2xx, hand it to the caller
    Success,
    /// 401 `token.expired`, recoverable through the refresh coordinator
    ExpiredToken,
    /// Any other 401; the session must end
    FatalAuth { code: Option<String> },
    /// Ordinary error status, returned to the caller untouched
    Failure,
}

pub fn classify(response: &ApiResponse) -> Disposition {
    if response.is_success() {
        return Disposition::Success;
    }
    if response.status != StatusCode::UNAUTHORIZED {
        return Disposition::Failure;
    }

    match error_code(response) {
        Some(code) if code == TOKEN_EXPIRED_CODE => Disposition::ExpiredToken,
        code => Disposition::FatalAuth { code },
    }
}

/// `message.code` from a 401 body, if the body has that shape
fn error_code(response: &ApiResponse) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message.code)
}

/// Turn an ordinary error response into the error returned to the caller
pub fn reject(response: &ApiResponse) -> ClientError {
    let message = response.text();
    let message = if message.is_empty() {
        response.status.to_string()
    } else {
        message
    };
    ClientError::from_status(response.status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn expired_token_is_recoverable() {
        let r = response(401, r#"{"message":{"code":"token.expired"}}"#);
        assert_eq!(classify(&r), Disposition::ExpiredToken);
    }

    #[test]
    fn other_401_codes_are_fatal() {
        let r = response(401, r#"{"message":{"code":"token.invalid"}}"#);
        assert_eq!(
            classify(&r),
            Disposition::FatalAuth {
                code: Some("token.invalid".into())
            }
        );
    }

    #[test]
    fn malformed_401_fails_closed() {
        assert_eq!(
            classify(&response(401, "Unauthorized")),
            Disposition::FatalAuth { code: None }
        );
        assert_eq!(
            classify(&response(401, r#"{"message":"expired"}"#)),
            Disposition::FatalAuth { code: None }
        );
        assert_eq!(
            classify(&response(401, r#"{"message":{}}"#)),
            Disposition::FatalAuth { code: None }
        );
    }

    #[test]
    fn non_401_errors_pass_through() {
        let r = response(403, r#"{"message":{"code":"token.expired"}}"#);
        assert_eq!(classify(&r), Disposition::Failure);
        assert_eq!(classify(&response(500, "")), Disposition::Failure);
        assert_eq!(classify(&response(204, "")), Disposition::Success);
    }

    #[test]
    fn reject_keeps_status_and_body() {
        let err = reject(&response(404, "no such todo"));
        assert!(matches!(
            err,
            ClientError::Status { status: 404, ref message } if message == "no such todo"
        ));

        let err = reject(&response(503, ""));
        assert_eq!(err.status(), Some(503));
    }
}
