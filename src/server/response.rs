//! Streaming a produced file back to the caller.

use std::path::{Path, PathBuf};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue},
    response::Response,
};
use futures::{stream, StreamExt, TryStreamExt};
use tokio::{fs::File, io::AsyncReadExt};
use tracing::warn;

use crate::processing::content_type_for;
use crate::server::errors::ApiError;

const CHUNK_SIZE: usize = 64 * 1024;

/// How the Content-Type of a response is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Always this value
    Fixed(&'static str),
    /// From the file extension, then from the file's leading bytes
    Detect,
}

/// Reopen `path` and stream it as a 200 response.
///
/// Once headers are out, a read failure can only be logged; the client sees
/// a truncated body.
pub async fn stream_file(
    path: &Path,
    content_type: ContentType,
    what: &str,
) -> Result<Response, ApiError> {
    let open_failed =
        |err: std::io::Error| ApiError::internal(format!("Failed to open {} file: {}", what, err));

    let mut file = File::open(path).await.map_err(open_failed)?;

    let mut head = vec![0u8; CHUNK_SIZE];
    let read = file.read(&mut head).await.map_err(open_failed)?;
    head.truncate(read);

    let content_type = match content_type {
        ContentType::Fixed(value) => value,
        ContentType::Detect => content_type_for(path, &head),
    };

    let logged_path: PathBuf = path.to_path_buf();
    let body = stream::iter([Ok::<_, std::io::Error>(Bytes::from(head))])
        .chain(stream::try_unfold(file, read_chunk))
        .inspect_err(move |err| {
            warn!(path = ?logged_path, "response stream aborted: {}", err);
        });

    let mut response = Response::new(Body::from_stream(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(response)
}

async fn read_chunk(mut file: File) -> std::io::Result<Option<(Bytes, File)>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let read = file.read(&mut buf).await?;
    if read == 0 {
        return Ok(None);
    }
    buf.truncate(read);
    Ok(Some((Bytes::from(buf), file)))
}
