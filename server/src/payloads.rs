use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder};
pub use common::payloads::*;
use serde::Serialize;

use crate::store::StoreError;

pub trait ToHttpResponse {
    /// Wraps a handler result in an HttpResponse.
    /// on_successful is the builder used for the Ok case.
    /// For example, you can set it to HttpResponse::Created() for 201 Created.
    /// Errors become `{"detail": ...}` with the matching status code.
    fn to_response(self, on_successful: HttpResponseBuilder) -> HttpResponse;
}

impl<T: Serialize> ToHttpResponse for Result<T, StoreError> {
    fn to_response(self, mut on_successful: HttpResponseBuilder) -> HttpResponse {
        match self {
            Ok(payload) => on_successful.json(payload),
            Err(e) => error_response(&e),
        }
    }
}

pub fn error_response(e: &StoreError) -> HttpResponse {
    let code = StatusCode::from_u16(e.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(code).json(ErrorDetail { detail: e.detail() })
}
