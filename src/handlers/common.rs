use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::query::FilteredPage;

/// Uniform response envelope: `status` and `message` first, then the payload.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
struct DataBody<T> {
    data: T,
}

/// 200 with a `data` payload.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    reply(StatusCode::OK, message, DataBody { data })
}

/// 201 with a `data` payload.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    reply(StatusCode::CREATED, message, DataBody { data })
}

/// 204; the envelope carries no payload on deletes.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// 200 with a filtered page flattened into the envelope, so clients see
/// `data`, `count` and `pagination` at the top level.
pub fn page<T: Serialize>(message: impl Into<String>, page: FilteredPage<T>) -> Response {
    reply(StatusCode::OK, message, page)
}

fn reply<T: Serialize>(status: StatusCode, message: impl Into<String>, body: T) -> Response {
    (
        status,
        Json(Envelope {
            status: status.as_u16(),
            message: message.into(),
            body,
        }),
    )
        .into_response()
}
