//! Request helpers shared by the integration tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

pub struct Sent {
    pub status: StatusCode,
    pub content_type: Option<String>,
    /// JSON bodies parsed; anything else kept as a string.
    pub body: Value,
}

pub async fn send(router: &Router, method: Method, uri: &str, credential: Option<&str>, body: Option<Value>) -> Sent {
    send_raw(router, method, uri, credential, body.map(|v| v.to_string()), &[]).await
}

pub async fn send_raw(
    router: &Router,
    method: Method,
    uri: &str,
    credential: Option<&str>,
    body: Option<String>,
    headers: &[(&str, &str)],
) -> Sent {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(credential) = credential {
        builder = builder.header(header::AUTHORIZATION, credential);
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(text) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(text)
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Sent {
        status,
        content_type,
        body,
    }
}
