//! `GET /downloads/{filename}`: stream an artifact, then delete it after a
//! grace period. `HEAD` reports the same headers and leaves the file alone.

use std::{
    io,
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use {
    axum::{
        body::{Body, Bytes},
        extract::{Path, State},
        http::{Method, StatusCode, header},
        response::{IntoResponse, Response},
    },
    futures::Stream,
    mediaferry_media::{cleanup, is_safe_file_name, mime::content_type_for},
    tokio_util::io::ReaderStream,
    tracing::{debug, info},
};

use crate::server::AppState;

pub async fn download_handler(
    method: Method,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_file_name(&filename) {
        debug!(%filename, "rejecting unsafe artifact name");
        return not_found();
    }

    let path = state.gateway.downloads_dir.join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "artifact not available");
            return not_found();
        },
    };
    let size = match file.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return not_found(),
    };

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&path).to_string()),
        (header::CONTENT_LENGTH, size.to_string()),
    ];
    if method == Method::HEAD {
        return (headers, Body::empty()).into_response();
    }

    info!(%filename, size, "serving artifact");
    let stream = DeleteAfterStream {
        inner: ReaderStream::new(file),
        path: Some(path),
        grace: state.gateway.grace_period,
    };
    (headers, Body::from_stream(stream)).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

/// Streams the file and schedules its deletion once the stream ends or the
/// response is dropped, whichever comes first.
struct DeleteAfterStream<S> {
    inner: S,
    path: Option<PathBuf>,
    grace: Duration,
}

impl<S> DeleteAfterStream<S> {
    fn schedule(&mut self) {
        if let Some(path) = self.path.take() {
            debug!(path = %path.display(), grace_ms = self.grace.as_millis() as u64, "artifact deletion scheduled");
            cleanup::try_schedule_deletion(path, self.grace);
        }
    }
}

impl<S> Stream for DeleteAfterStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            self.schedule();
        }
        polled
    }
}

impl<S> Drop for DeleteAfterStream<S> {
    fn drop(&mut self) {
        self.schedule();
    }
}
