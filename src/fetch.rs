use crate::error::{ExtractorError, Result};
use crate::observability::metrics;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Total request timeout for the source GET.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Statuses worth retrying; any other non-2xx fails immediately.
pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Bounded retry with exponential backoff for the source fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Sleep before attempt n+1 is `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
    pub retry_statuses: &'static [u16],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            retry_statuses: RETRY_STATUSES,
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt.saturating_sub(1))
    }

    fn retries_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }
}

/// Builds the shared HTTP client with the fetch timeout baked in. Constructed
/// once per process and handed to the pipeline.
pub fn build_client() -> Result<Client> {
    Ok(Client::builder().timeout(FETCH_TIMEOUT).build()?)
}

/// Issues the source GET and decodes the JSON body.
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// GET `url`, retrying transport failures and the retryable status set
    /// until the attempt budget runs out. A body that is not valid JSON is
    /// fatal and never retried.
    pub async fn fetch(&self, url: &str) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await?;
                        metrics::fetch::request_success();
                        metrics::fetch::request_duration(started.elapsed().as_secs_f64());
                        metrics::fetch::payload_bytes(body.len());
                        debug!(attempt, bytes = body.len(), "Fetched source payload");
                        return Ok(serde_json::from_str(&body)?);
                    }

                    metrics::fetch::request_error();
                    if self.policy.retries_status(status) && attempt < self.policy.max_attempts {
                        let delay = self.policy.backoff_for(attempt);
                        warn!(attempt, status = %status, "Retryable status from source, backing off {:?}", delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ExtractorError::Fetch {
                        message: format!(
                            "source returned status {} after {} attempt(s)",
                            status, attempt
                        ),
                    });
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    metrics::fetch::request_error();
                    let delay = self.policy.backoff_for(attempt);
                    warn!(attempt, "Transport error from source ({}), backing off {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    metrics::fetch::request_error();
                    return Err(ExtractorError::Fetch {
                        message: format!("source unreachable after {} attempt(s): {}", attempt, e),
                    });
                }
            }
        }
    }
}

/// Resolves a decoded payload to its list of raw items. The list may live
/// under `results`, under `data`, or be the payload itself; a bare object is
/// a batch of one. Keys holding null count as absent.
pub fn resolve_items(payload: Value) -> Result<Vec<Value>> {
    let candidate = match &payload {
        Value::Object(map) => map
            .get("results")
            .filter(|v| !v.is_null())
            .or_else(|| map.get("data").filter(|v| !v.is_null()))
            .cloned(),
        _ => None,
    };

    match candidate.unwrap_or(payload) {
        Value::Array(items) => Ok(items),
        item @ Value::Object(_) => Ok(vec![item]),
        other => Err(ExtractorError::Shape(format!(
            "expected a record list or object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_under_results_key() {
        let items = resolve_items(json!({"results": [{"a": 1}, {"a": 2}]})).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn items_under_data_key() {
        let items = resolve_items(json!({"data": [{"a": 1}]})).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn top_level_list_is_the_batch() {
        let items = resolve_items(json!([{"a": 1}, {"a": 2}, {"a": 3}])).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn bare_object_becomes_singleton() {
        let items = resolve_items(json!({"gender": "male"})).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], json!({"gender": "male"}));
    }

    #[test]
    fn empty_results_list_stays_empty() {
        // An empty list under a known key is a legitimate empty batch, not a
        // cue to treat the envelope itself as the record.
        let items = resolve_items(json!({"results": []})).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn null_results_falls_through_to_data() {
        let items = resolve_items(json!({"results": null, "data": [{"a": 1}]})).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn results_key_wins_over_data() {
        let items = resolve_items(json!({"results": [{"a": 1}], "data": [{"b": 1}, {"b": 2}]}))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], json!({"a": 1}));
    }

    #[test]
    fn scalar_payload_is_a_shape_error() {
        assert!(matches!(
            resolve_items(json!(42)),
            Err(ExtractorError::Shape(_))
        ));
        assert!(matches!(
            resolve_items(json!("nope")),
            Err(ExtractorError::Shape(_))
        ));
    }

    #[test]
    fn scalar_under_results_is_a_shape_error() {
        assert!(matches!(
            resolve_items(json!({"results": "not a list"})),
            Err(ExtractorError::Shape(_))
        ));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn default_policy_matches_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_statuses, &[429, 500, 502, 503, 504]);
    }
}
