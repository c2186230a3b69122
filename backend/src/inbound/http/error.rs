//! Domain errors rendered as HTTP responses.
//!
//! The body is the serialised [`Error`]. Internal failures are logged in full
//! and reach the client only as a generic message. The request's trace
//! identifier is attached to the body and echoed in the `trace-id` header.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode};
use crate::middleware::{TRACE_ID_HEADER, TraceId};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const HIDDEN_MESSAGE: &str = "Internal server error";

const fn http_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The error as the client is allowed to see it.
fn client_view(error: &Error) -> Error {
    let trace_id = error
        .trace_id()
        .map(str::to_owned)
        .or_else(|| TraceId::current().map(|id| id.to_string()));
    let visible = if error.code() == ErrorCode::InternalError {
        error!(
            message = error.message(),
            trace_id = trace_id.as_deref(),
            "internal error hidden from client"
        );
        Error::internal(HIDDEN_MESSAGE)
    } else {
        error.clone()
    };
    match trace_id {
        Some(id) => visible.with_trace_id(id),
        None => visible,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        http_status(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let visible = client_view(self);
        let mut response = HttpResponse::build(self.status_code());
        if let Some(id) = visible.trace_id() {
            response.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        response.json(visible)
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error surfaced as internal error");
        Self::internal(HIDDEN_MESSAGE)
    }
}
