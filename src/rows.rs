use std::sync::Once;

use rayon::prelude::*;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, warn};

static INIT: Once = Once::new();

// Below this many calls the pool handoff costs more than the parsing
const PARALLEL_THRESHOLD: usize = 64;

/// One accepted call row.
#[derive(Debug, Clone)]
pub enum Row {
    /// `payload` is the text exactly as received; `value` is the same JSON
    /// validated but kept verbatim, so numbers and key order survive the echo.
    Valid {
        index: usize,
        payload: String,
        value: Box<RawValue>,
    },
    Invalid { index: usize },
}

/// Sizes the global pool used by [`parse_calls`]. Later calls in the same
/// process are no-ops.
pub fn init_thread_pool(workers: usize) {
    INIT.call_once(|| {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
        {
            warn!(workers, error = %e, "Row parsing pool already configured");
        }
    });
}

/// Classifies every call in input order. Calls that are not a non-empty array
/// are dropped.
pub fn parse_calls(calls: &[Value], workers: usize) -> Vec<Row> {
    if workers > 1 && calls.len() >= PARALLEL_THRESHOLD {
        calls
            .par_iter()
            .enumerate()
            .filter_map(|(index, call)| parse_call(index, call))
            .collect()
    } else {
        calls
            .iter()
            .enumerate()
            .filter_map(|(index, call)| parse_call(index, call))
            .collect()
    }
}

fn parse_call(index: usize, call: &Value) -> Option<Row> {
    let first = match call.as_array().and_then(|args| args.first()) {
        Some(first) => first,
        None => {
            debug!(index, "Skipping call that is not a non-empty array");
            return None;
        }
    };

    let Some(payload) = first.as_str() else {
        warn!(index, value = %first, "Invalid JSON format");
        return Some(Row::Invalid { index });
    };

    match serde_json::from_str::<Box<RawValue>>(payload) {
        Ok(value) => Some(Row::Valid {
            index,
            payload: payload.to_string(),
            value,
        }),
        Err(e) => {
            warn!(index, payload, error = %e, "Invalid JSON format");
            Some(Row::Invalid { index })
        }
    }
}
