use lambda_http::http::header::CONTENT_TYPE;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Error, Request, Response};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::publisher::{publish_all, OutboundMessage, Publisher};
use crate::rows::{parse_calls, Row};

const INVALID_REQUEST: &str = "Invalid request format";
const INVALID_JSON: &str = "Invalid JSON format";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Serialize)]
#[serde(untagged)]
enum Reply {
    Echo(Box<RawValue>),
    Error { error: &'static str },
}

#[derive(Serialize)]
struct RepliesResponse {
    replies: Vec<Reply>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// Republishes every call row's payload to the topic and echoes the parsed
/// rows back once all publishes have settled.
pub async fn function_handler<P: Publisher>(
    publisher: &P,
    config: &Config,
    event: Request,
) -> Result<Response<Body>, Error> {
    if !is_json(&event) {
        warn!("Rejecting request without a JSON content type");
        return json_response(&ErrorResponse { error: INVALID_REQUEST });
    }
    let Some(calls) = extract_calls(event.body()) else {
        warn!("Rejecting request without a calls array");
        return json_response(&ErrorResponse { error: INVALID_REQUEST });
    };
    info!(calls = calls.len(), "Received calls");

    let rows = parse_calls(&calls, config.workers);

    let mut replies = Vec::with_capacity(rows.len());
    let mut messages = Vec::new();
    for row in rows {
        match row {
            Row::Valid { index, payload, value } => {
                replies.push(Reply::Echo(value));
                messages.push(OutboundMessage::for_row(index, payload));
            }
            Row::Invalid { index } => {
                debug!(index, "Replying with error marker");
                replies.push(Reply::Error { error: INVALID_JSON });
            }
        }
    }

    let summary = publish_all(publisher, &config.batch, messages).await;
    info!(
        replies = replies.len(),
        published = summary.published,
        failed = summary.failed,
        "Finished publishing"
    );

    json_response(&RepliesResponse { replies })
}

// application/json or application/*+json, parameters ignored
fn is_json(event: &Request) -> bool {
    let Some(mime) = event
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
    else {
        return false;
    };
    let mime = mime.trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

// Calls array of a non-empty JSON object body, if there is one
fn extract_calls(body: &[u8]) -> Option<Vec<Value>> {
    let Ok(Value::Object(mut request)) = serde_json::from_slice::<Value>(body) else {
        return None;
    };
    match request.remove("calls") {
        Some(Value::Array(calls)) => Some(calls),
        _ => None,
    }
}

fn json_response<T: Serialize>(body: &T) -> Result<Response<Body>, Error> {
    let json = match serde_json::to_string(body) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Error processing request");
            format!(r#"{{"error":"{INTERNAL_ERROR}"}}"#)
        }
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json))
        .map_err(Box::new)?;
    Ok(response)
}
