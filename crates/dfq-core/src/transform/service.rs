//! HTTP client for an Ollama-style transformation endpoint.
//!
//! Uses the curl crate (libcurl). One POST per span; the whole call is
//! blocking and is invoked from the executor's blocking workers.

use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use super::{parse_reply, FormattedUnit, TransformError, UnitTransformer};
use crate::config::ServiceConfig;

const SYSTEM_PROMPT: &str = "You format spans of an academic document. Reply with exactly one \
JSON object with the keys formatted_text, formatting_type (header|list|paragraph), font_style \
(normal|bold|italic), font_size and alignment (left|center|right|justify).";

const USER_PROMPT_TEMPLATE: &str = "Format this span and classify its structure:\n{text}";

/// Blocking client for the text-transformation service.
pub struct ServiceTransformer {
    generate_url: String,
    probe_url: String,
    model: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ServiceTransformer {
    pub fn new(cfg: &ServiceConfig) -> Result<Self> {
        let base = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid service base_url: {}", cfg.base_url))?;
        let generate_url = base
            .join("api/generate")
            .context("build generate endpoint")?
            .to_string();
        Ok(Self {
            generate_url,
            probe_url: base.to_string(),
            model: cfg.model.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        })
    }

    /// POST a JSON payload and collect the response body.
    fn post_json(&self, url: &str, payload: &[u8]) -> Result<(u32, Vec<u8>), TransformError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_setup_err)?;
        easy.post(true).map_err(curl_setup_err)?;
        easy.post_fields_copy(payload).map_err(curl_setup_err)?;
        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/json")
            .map_err(curl_setup_err)?;
        easy.http_headers(list).map_err(curl_setup_err)?;
        easy.connect_timeout(self.connect_timeout)
            .map_err(curl_setup_err)?;
        easy.timeout(self.request_timeout).map_err(curl_setup_err)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(curl_setup_err)?;
            transfer.perform().map_err(classify_curl_error)?;
        }

        let code = easy.response_code().map_err(curl_setup_err)?;
        Ok((code, body))
    }
}

impl UnitTransformer for ServiceTransformer {
    fn transform_unit(&self, text: &str) -> Result<FormattedUnit, TransformError> {
        let prompt = format!(
            "{}\n\n{}",
            SYSTEM_PROMPT,
            USER_PROMPT_TEMPLATE.replace("{text}", text)
        );
        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let payload = serde_json::to_vec(&request)
            .map_err(|e| TransformError::Other(format!("encode request: {}", e)))?;

        let (code, body) = self.post_json(&self.generate_url, &payload)?;
        if !(200..300).contains(&code) {
            return Err(TransformError::Http(code));
        }

        let envelope: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| TransformError::Other(format!("decode reply: {}", e)))?;
        match envelope.get("response").and_then(|v| v.as_str()) {
            Some(reply) => Ok(parse_reply(reply, text)),
            None => {
                tracing::warn!("empty service reply, keeping original span text");
                Ok(super::fallback_unit(text))
            }
        }
    }

    /// GET the service root; any 2xx means the service is up.
    fn probe(&self) -> Result<(), TransformError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&self.probe_url).map_err(curl_setup_err)?;
        easy.connect_timeout(self.connect_timeout)
            .map_err(curl_setup_err)?;
        easy.timeout(Duration::from_secs(10)).map_err(curl_setup_err)?;
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| Ok(data.len()))
                .map_err(curl_setup_err)?;
            transfer.perform().map_err(classify_curl_error)?;
        }
        let code = easy.response_code().map_err(curl_setup_err)?;
        if !(200..300).contains(&code) {
            return Err(TransformError::Http(code));
        }
        Ok(())
    }
}

/// Classify a curl transfer failure for the error taxonomy.
fn classify_curl_error(e: curl::Error) -> TransformError {
    if e.is_operation_timedout() {
        return TransformError::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransformError::Connection(e.to_string());
    }
    TransformError::Other(e.to_string())
}

fn curl_setup_err(e: curl::Error) -> TransformError {
    TransformError::Other(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_from_config() {
        let cfg = ServiceConfig::default();
        let t = ServiceTransformer::new(&cfg).unwrap();
        assert_eq!(t.generate_url, "http://localhost:11434/api/generate");
        assert_eq!(t.probe_url, "http://localhost:11434/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg = ServiceConfig {
            base_url: "not a url".to_string(),
            ..ServiceConfig::default()
        };
        assert!(ServiceTransformer::new(&cfg).is_err());
    }
}
