//! Label value codec
//!
//! Label values are stored as canonical JSON arrays. Where they become part of
//! a key they are additionally base64 encoded, which keeps colons and glob
//! metacharacters out of the key.

use crate::error::{MetricsError, MetricsResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Bucket marker of the histogram sum field
pub const SUM_BUCKET: &str = "sum";

/// Bucket marker of the implicit overflow bucket
pub const INF_BUCKET: &str = "+Inf";

/// Encode label values as a JSON array
pub fn encode(label_values: &[String]) -> MetricsResult<String> {
    serde_json::to_string(label_values).map_err(|e| MetricsError::encoding(e.to_string()))
}

/// Decode a JSON array produced by [`encode`]
pub fn decode(encoded: &str) -> MetricsResult<Vec<String>> {
    serde_json::from_str(encoded)
        .map_err(|e| MetricsError::decode(format!("label values {:?}: {}", encoded, e)))
}

/// Encode label values for use inside a key
pub fn encode_key_safe(label_values: &[String]) -> MetricsResult<String> {
    Ok(STANDARD.encode(encode(label_values)?))
}

/// Decode label values produced by [`encode_key_safe`]
pub fn decode_key_safe(encoded: &str) -> MetricsResult<Vec<String>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| MetricsError::decode(format!("label values {:?}: {}", encoded, e)))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| MetricsError::decode(format!("label values {:?}: {}", encoded, e)))?;
    decode(&json)
}

#[derive(Serialize, Deserialize)]
struct BucketField {
    b: String,
    #[serde(rename = "labelValues")]
    label_values: Vec<String>,
}

/// Encode a histogram hash field: a bucket marker plus label values
pub fn encode_bucket_field(bucket: &str, label_values: &[String]) -> MetricsResult<String> {
    serde_json::to_string(&BucketField {
        b: bucket.to_string(),
        label_values: label_values.to_vec(),
    })
    .map_err(|e| MetricsError::encoding(e.to_string()))
}

/// Decode a histogram hash field into its bucket marker and label values
pub fn decode_bucket_field(field: &str) -> MetricsResult<(String, Vec<String>)> {
    let parsed: BucketField = serde_json::from_str(field)
        .map_err(|e| MetricsError::decode(format!("histogram field {:?}: {}", field, e)))?;
    Ok((parsed.b, parsed.label_values))
}

/// Render a bucket boundary the way it appears in fields and `le` labels
pub fn format_bound(bound: f64) -> String {
    if bound == f64::INFINITY {
        INF_BUCKET.to_string()
    } else {
        bound.to_string()
    }
}
