//! Query bodies for the search index.

use serde_json::{json, Value};

use vpower_types::{Subject, Timestamp};

/// Document fields a snapshot is built from.
pub const SNAPSHOT_FIELDS: [&str; 7] = [
    "account",
    "stake",
    "proxy",
    "proxy_for",
    "votes",
    "block_number",
    "block_time",
];

/// Name of the aggregation carrying the newest block time.
pub const HEAD_AGGREGATION: &str = "max_block_time";

/// The newest document of `subject` with `start <= block_time < end`.
pub fn window_query(subject: &Subject, start: Timestamp, end: Timestamp) -> Value {
    json!({
        "size": 1,
        "_source": SNAPSHOT_FIELDS,
        "query": {
            "bool": {
                "filter": [
                    subject_filter(subject),
                    {
                        "range": {
                            "block_time": {
                                "gte": start.to_rfc3339(),
                                "lt": end.to_rfc3339(),
                            }
                        }
                    }
                ]
            }
        },
        "sort": [
            { "block_time": { "order": "desc" } },
            { "block_number": { "order": "desc" } }
        ]
    })
}

/// The newest `limit` documents of `subject`, newest first.
pub fn history_query(subject: &Subject, limit: usize) -> Value {
    json!({
        "size": limit,
        "_source": SNAPSHOT_FIELDS,
        "query": { "bool": { "filter": [subject_filter(subject)] } },
        "sort": [
            { "block_time": { "order": "desc" } },
            { "block_number": { "order": "desc" } }
        ]
    })
}

fn subject_filter(subject: &Subject) -> Value {
    match subject {
        Subject::Account(id) => json!({ "match": { "account": id } }),
        Subject::Worker(vote_id) => json!({ "term": { "votes": vote_id } }),
    }
}

/// Max operation block time over the day before `now`.
pub fn head_block_query(now: Timestamp) -> Value {
    let since = now.days_before(1).unwrap_or(now).as_datetime();
    json!({
        "size": 0,
        "query": {
            "range": {
                "block_data.block_time": {
                    "gte": since.format("%Y-%m-%d").to_string(),
                    "lte": "now",
                }
            }
        },
        "aggs": {
            HEAD_AGGREGATION: { "max": { "field": "block_data.block_time" } }
        }
    })
}

/// Monthly operations index holding `now`, e.g. `bitshares-2019-04`.
pub fn operations_index(prefix: &str, now: Timestamp) -> String {
    format!("{prefix}{}", now.as_datetime().format("%Y-%m"))
}
