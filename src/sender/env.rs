use std::env;
use std::time::Duration;

/// Default Zipkin collector endpoint
const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://127.0.0.1:9411/api/v2/spans";

/// HTTP endpoint for the Zipkin collector.
/// e.g. "http://localhost:9411/api/v2/spans"
const ENV_ENDPOINT: &str = "ZIPKIN_SENDER_ENDPOINT";

/// Maximum time the default HTTP client will wait for a send
const ENV_TIMEOUT: &str = "ZIPKIN_SENDER_TIMEOUT";

/// Default transport timeout in milliseconds
const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_millis(10_000);

pub(crate) fn get_timeout() -> Duration {
    match env::var(ENV_TIMEOUT).ok().filter(|var| !var.is_empty()) {
        Some(timeout) => match timeout.parse() {
            Ok(timeout) => Duration::from_millis(timeout),
            Err(e) => {
                eprintln!("{} malformed defaulting to 10000: {}", ENV_TIMEOUT, e);
                DEFAULT_COLLECTOR_TIMEOUT
            }
        },
        None => DEFAULT_COLLECTOR_TIMEOUT,
    }
}

pub(crate) fn get_endpoint() -> String {
    match env::var(ENV_ENDPOINT).ok().filter(|var| !var.is_empty()) {
        Some(endpoint) => endpoint,
        None => DEFAULT_COLLECTOR_ENDPOINT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_defaults() {
        temp_env::with_vars_unset([ENV_TIMEOUT, ENV_ENDPOINT], || {
            assert_eq!(DEFAULT_COLLECTOR_TIMEOUT, get_timeout());
            assert_eq!(DEFAULT_COLLECTOR_ENDPOINT, get_endpoint());
        });

        // Bad timeout value
        temp_env::with_var(ENV_TIMEOUT, Some("a"), || {
            assert_eq!(DEFAULT_COLLECTOR_TIMEOUT, get_timeout());
        });

        // Good timeout value
        temp_env::with_var(ENV_TIMEOUT, Some("777"), || {
            assert_eq!(Duration::from_millis(777), get_timeout());
        });

        // Custom endpoint
        let custom_endpoint = "https://example.com/api/v2/spans";
        temp_env::with_var(ENV_ENDPOINT, Some(custom_endpoint), || {
            assert_eq!(custom_endpoint, get_endpoint());
        });
    }
}
