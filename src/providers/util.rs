use anyhow::Error;
use serde::{Deserialize, Deserializer};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Market data APIs send numbers either as JSON numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Deserializes an optional number that may arrive quoted. Unparsable text
/// becomes `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
        None => None,
    }
    .filter(|n: &f64| n.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "lenient_f64")]
        value: Option<f64>,
    }

    fn parse(json: &str) -> Option<f64> {
        serde_json::from_str::<Row>(json).unwrap().value
    }

    #[test]
    fn test_lenient_f64_accepts_numbers_and_strings() {
        assert_eq!(parse(r#"{"value": 1.5}"#), Some(1.5));
        assert_eq!(parse(r#"{"value": "2.25"}"#), Some(2.25));
        assert_eq!(parse(r#"{"value": "n/a"}"#), None);
        assert_eq!(parse(r#"{"value": null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_retries() {
        let mut calls = 0;
        let result: Result<(), Error> = with_retry(
            || {
                calls += 1;
                async { reqwest::get("http://127.0.0.1:1/").await.map(|_| ()) }
            },
            2,
            1,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
