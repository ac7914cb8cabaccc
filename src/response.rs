//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it, or return anything
//! that implements [`IntoResponse`].

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::error;

use crate::error::Error;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// An outgoing HTTP response.
///
/// ```rust
/// use gantry::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` with `application/json` bytes from your serialiser.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK` with a raw body and no content type.
    pub fn raw(body: impl Into<Bytes>) -> Self {
        Self::builder().raw(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: Vec::new() }
    }

    /// Appends a header to an already built response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(Full::new(self.body)) {
            Ok(response) => response,
            Err(e) => {
                error!("invalid response: {e}");
                let mut fallback = http::Response::new(Full::new(Bytes::new()));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            }
        }
    }
}

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.typed(JSON, body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.typed(TEXT, Bytes::from(body.into()))
    }

    /// Terminate with a body of any content type.
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> Response {
        self.typed(content_type, body.into())
    }

    /// Terminate with a body and no content type.
    pub fn raw(self, body: impl Into<Bytes>) -> Response {
        Response { status: self.status, headers: self.headers, body: body.into() }
    }

    pub fn no_body(self) -> Response {
        self.raw(Bytes::new())
    }

    fn typed(self, content_type: &str, body: Bytes) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// Overrides the status of any other response: `(StatusCode::CREATED, Json(user))`.
impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        response.status = self.0;
        response
    }
}

impl<T: IntoResponse> IntoResponse for Result<T, Error> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Routing failures become 404, bad input 400, everything else 500.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NoMatch | Error::NoRoutesRegistered => StatusCode::NOT_FOUND,
            Error::Bind(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("handler failed: {self}");
        }
        Response::builder().status(status).text(self.to_string())
    }
}

/// Serializes `T` as a JSON body.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::json(bytes),
            Err(e) => {
                error!("failed to serialize response: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn json_sets_content_type() {
        let response = Json(serde_json::json!({ "hello": 1 })).into_response();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(header(&response, "content-type"), Some(JSON));
        assert_eq!(response.body(), br#"{"hello":1}"#);
    }

    #[test]
    fn builder_keeps_extra_headers_after_content_type() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("x-test", "ok")
            .text("made");
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.headers()[0].0, "content-type");
        assert_eq!(header(&response, "x-test"), Some("ok"));
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(Error::NoMatch.into_response().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::ObjectNotFound("db".into()).into_response().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let bad: Result<Response, Error> = Err(serde_json::from_str::<u8>("x").unwrap_err().into());
        assert_eq!(bad.into_response().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_tuple_overrides() {
        let response = (StatusCode::ACCEPTED, "queued").into_response();
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert_eq!(response.body(), b"queued");
    }

    #[test]
    fn invalid_header_falls_back_to_500() {
        let response = Response::text("x").with_header("bad header", "v").into_http();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
