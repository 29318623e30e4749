use axum::response::Response;
use http_body_util::BodyExt;
use rand::RngCore;

/// Boundary used by [`multipart_body`]
pub const BOUNDARY: &str = "tubely-test-boundary";

/// One part of a multipart form
pub struct FormPart<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub const fn file(name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: "upload.bin",
            content_type: Some(content_type),
            data,
        }
    }
}

/// `Content-Type` header value matching [`multipart_body`]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Encodes `parts` as a `multipart/form-data` body
pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, part.filename
            )
            .as_bytes(),
        );
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Read response body as raw bytes
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Random bytes of the given size
pub fn random_bytes(size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}
