// Chunked NDJSON streaming of browse events
use crate::application::events::BrowseEvent;
use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};

pub const EPOCH_HEADER: &str = "x-selection-epoch";

/// Create a chunked NDJSON streaming response, one event per line
pub fn ndjson_stream<S>(stream: S, epoch: u64) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = BrowseEvent> + Send + 'static,
{
    let byte_stream = stream.map(serialize_line);
    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(EPOCH_HEADER, HeaderValue::from(epoch))
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn serialize_line(event: BrowseEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(&event)?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Events of one selection cycle. Ends after the event that closes the
/// cycle, or as soon as a newer cycle shows up.
pub fn cycle_events(
    mut rx: broadcast::Receiver<BrowseEvent>,
    epoch: u64,
) -> impl Stream<Item = BrowseEvent> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => match event.epoch() {
                    Some(e) if e == epoch => {
                        let done = event.ends_cycle();
                        yield event;
                        if done {
                            break;
                        }
                    }
                    Some(e) if e > epoch => {
                        tracing::debug!("Cycle {} superseded by {}, closing stream", epoch, e);
                        break;
                    }
                    _ => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event stream for cycle {} skipped {} events", epoch, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Helper to create a streaming response for one selection cycle
pub fn stream_cycle(rx: broadcast::Receiver<BrowseEvent>, epoch: u64) -> impl IntoResponse {
    match ndjson_stream(cycle_events(rx, epoch), epoch) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(epoch: u64) -> BrowseEvent {
        BrowseEvent::ExcerptReady {
            epoch,
            parameter: "PM10".to_string(),
            excerpt: "• PM10:\n  no data\n".to_string(),
        }
    }

    fn complete(epoch: u64) -> BrowseEvent {
        BrowseEvent::AggregationComplete {
            epoch,
            station_id: 1,
            summary: String::new(),
            parameters: vec!["PM10".to_string()],
            failed: 0,
        }
    }

    #[tokio::test]
    async fn test_cycle_events_stop_at_completion() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(excerpt(1)).unwrap();
        tx.send(BrowseEvent::StationListReady { count: 3 }).unwrap();
        tx.send(excerpt(2)).unwrap();
        tx.send(complete(2)).unwrap();
        tx.send(excerpt(2)).unwrap();

        let events: Vec<BrowseEvent> = cycle_events(rx, 2).collect().await;
        assert_eq!(events, vec![excerpt(2), complete(2)]);
    }

    #[tokio::test]
    async fn test_cycle_events_stop_when_superseded() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(excerpt(1)).unwrap();
        tx.send(excerpt(2)).unwrap();
        tx.send(complete(1)).unwrap();

        let events: Vec<BrowseEvent> = cycle_events(rx, 1).collect().await;
        assert_eq!(events, vec![excerpt(1)]);
    }

    #[test]
    fn test_serialize_line() {
        let line = serialize_line(BrowseEvent::StationListReady { count: 3 }).unwrap();
        assert_eq!(&line[..], b"{\"event\":\"station_list_ready\",\"count\":3}\n");
    }
}
