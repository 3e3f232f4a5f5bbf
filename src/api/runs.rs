//! Run endpoints.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::types::{CreateRunRequest, ErrorBody, ErrorResponse, RunResponse};
use super::AppState;
use crate::agents::Topic;
use crate::error::{ErrorKind, PipelineError};
use crate::events::{EventSink, PipelineEvent};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::MalformedOutput => StatusCode::BAD_GATEWAY,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        // nginx's "client closed request"
        ErrorKind::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub(super) fn error_response(error: &PipelineError) -> Response {
    let kind = error.kind();
    let body = ErrorResponse {
        error: ErrorBody {
            kind,
            message: error.to_string(),
        },
    };
    (status_for(kind), Json(body)).into_response()
}

/// Run to completion and return the document.
///
/// Dropping the request (client disconnect) drops the run future, which
/// abandons any in-flight role call.
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRunRequest>,
) -> Response {
    let run_id = Uuid::new_v4();
    tracing::info!(run_id = %run_id, "Run requested");

    let _permit = match state.acquire_slot().await {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match state
        .orchestrator
        .run(run_id, &req.topic, &EventSink::disabled(), &CancellationToken::new())
        .await
    {
        Ok(outcome) => Json(RunResponse::from_outcome(run_id, outcome)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Stream the run's status events via SSE.
///
/// The run executes in its own task; closing the stream cancels it.
pub async fn stream_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    // Reject bad topics with a plain 400 before opening the stream.
    Topic::parse(&req.topic).map_err(|e| error_response(&e))?;

    let run_id = Uuid::new_v4();
    let (sink, mut rx) = EventSink::channel();
    let cancel = CancellationToken::new();

    let task_state = Arc::clone(&state);
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        let permit = tokio::select! {
            biased;
            _ = task_cancel.cancelled() => return,
            permit = task_state.acquire_slot() => permit,
        };
        match permit {
            Ok(_permit) => {
                let _ = task_state
                    .orchestrator
                    .run(run_id, &req.topic, &sink, &task_cancel)
                    .await;
            }
            Err(e) => sink.emit(PipelineEvent::Error {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    });

    tracing::info!(run_id = %run_id, "Run SSE stream opened");

    struct StreamDropGuard {
        run_id: Uuid,
        cancel: CancellationToken,
    }

    impl Drop for StreamDropGuard {
        fn drop(&mut self) {
            // No-op when the run already finished.
            self.cancel.cancel();
            tracing::info!(run_id = %self.run_id, "Run SSE stream closed");
        }
    }

    let drop_guard = StreamDropGuard { run_id, cancel };

    let stream = async_stream::stream! {
        let _guard = drop_guard;

        while let Some(timed) = rx.recv().await {
            let terminal = timed.event.is_terminal();
            match Event::default().event(timed.event.event_name()).json_data(&timed) {
                Ok(sse) => yield Ok(sse),
                Err(e) => {
                    tracing::error!(
                        run_id = %run_id,
                        event = %timed.event.event_name(),
                        error = %e,
                        "Failed to serialize SSE event; dropping"
                    );
                }
            }
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEPALIVE_INTERVAL)
            .text("keepalive"),
    ))
}
