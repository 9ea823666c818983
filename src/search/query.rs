//! Elasticsearch request bodies and response decoding

use super::error::{SearchError, SearchResult};
use super::types::{FbiPageRequest, Page, PageHit, StacPageRequest, UriBound};
use serde::Deserialize;
use serde_json::{json, Value};

pub const FBI_PATH_FIELD: &str = "path";
pub const FBI_SORT_FIELD: &str = "path.keyword";
pub const STAC_URI_FIELD: &str = "properties.uri";
pub const STAC_SORT_FIELD: &str = "properties.uri.keyword";

/// Body for a sliced PIT search over FBI file records
///
/// Only `type: file` records without a `removed` marker are returned, sorted
/// by path.
pub fn fbi_search_body(request: &FbiPageRequest) -> Value {
    let mut filters = vec![json!({ "term": { "type": "file" } })];
    if let Some(after) = &request.after_path {
        filters.push(json!({ "range": { FBI_SORT_FIELD: { "gt": after } } }));
    }

    let mut body = json!({
        "size": request.size,
        "_source": [FBI_PATH_FIELD],
        "query": {
            "bool": {
                "filter": filters,
                "must_not": [{ "exists": { "field": "removed" } }],
            }
        },
        "sort": [{ FBI_SORT_FIELD: "asc" }],
        "pit": { "id": request.pit_id, "keep_alive": request.keep_alive },
    });

    if let Some(slice) = request.slice {
        body["slice"] = json!({ "id": slice.id, "max": slice.max });
    }
    if let Some(search_after) = &request.search_after {
        body["search_after"] = Value::Array(search_after.clone());
    }
    body
}

/// Body for a page of STAC asset URIs in ascending order
pub fn stac_search_body(request: &StacPageRequest) -> Value {
    let query = match &request.from {
        UriBound::Unbounded => json!({ "match_all": {} }),
        UriBound::Inclusive(from) => json!({ "range": { STAC_SORT_FIELD: { "gte": from } } }),
        UriBound::Exclusive(after) => json!({ "range": { STAC_SORT_FIELD: { "gt": after } } }),
    };

    json!({
        "size": request.size,
        "_source": [STAC_URI_FIELD],
        "query": query,
        "sort": [{ STAC_SORT_FIELD: "asc" }],
    })
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    pit_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(default)]
    sort: Vec<Value>,
}

/// Decode a search response, pulling the dotted `field` out of each `_source`
pub fn decode_page(response: Value, field: &str) -> SearchResult<Page> {
    let envelope: SearchEnvelope = serde_json::from_value(response)
        .map_err(|e| SearchError::response(format!("search response: {e}")))?;
    let pointer = format!("/{}", field.replace('.', "/"));

    let hits = envelope
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let path = hit
                .source
                .pointer(&pointer)
                .and_then(Value::as_str)
                .ok_or_else(|| SearchError::response(format!("hit without {field}: {}", hit.source)))?;
            Ok(PageHit {
                path: path.to_string(),
                sort: hit.sort,
            })
        })
        .collect::<SearchResult<Vec<_>>>()?;

    Ok(Page {
        hits,
        pit_id: envelope.pit_id,
    })
}
