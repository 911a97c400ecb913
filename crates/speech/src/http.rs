use std::time::Duration;

use async_trait::async_trait;
use expensebot_core::config::SpeechConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::provider::{AudioSource, TranscribeError, TranscriptionProvider};

/// HTTP client for a whisper-style transcription endpoint. The endpoint
/// receives the raw audio bytes and answers with `{"text": "..."}`.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
    /// Builds the transcriber from the speech section of the configuration.
    /// Returns `Ok(None)` when the capability is disabled or unconfigured so
    /// callers can skip audio entry points entirely.
    pub fn from_config(config: &SpeechConfig) -> Result<Option<Self>, TranscribeError> {
        if !config.is_available() {
            return Ok(None);
        }
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.trim().to_string(),
            None => return Ok(None),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                TranscribeError::Unavailable(format!("could not build http client: {error}"))
            })?;

        Ok(Some(Self { client, endpoint, api_key: config.api_key.clone() }))
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriber {
    async fn transcribe(&self, audio: &AudioSource) -> Result<String, TranscribeError> {
        if audio.bytes.is_empty() {
            return Err(TranscribeError::Decode("audio clip is empty".to_string()));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/octet-stream")
            .header("x-file-name", audio.file_name.as_str())
            .body(audio.bytes.clone());

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_connect() || error.is_timeout() {
                TranscribeError::Unavailable(error.to_string())
            } else {
                TranscribeError::Request(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscribeError::Request(format!(
                "transcription endpoint answered {status}"
            )));
        }

        let parsed: TranscriptionResponse = response.json().await.map_err(|error| {
            TranscribeError::Decode(format!("unexpected transcription response: {error}"))
        })?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::NoSpeech);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use expensebot_core::config::SpeechConfig;

    use super::HttpTranscriber;

    fn speech_config(enabled: bool, endpoint: Option<&str>) -> SpeechConfig {
        SpeechConfig {
            enabled,
            endpoint: endpoint.map(str::to_string),
            api_key: None,
            timeout_secs: 30,
        }
    }

    #[test]
    fn disabled_config_yields_no_transcriber() {
        let transcriber = HttpTranscriber::from_config(&speech_config(
            false,
            Some("http://localhost:9000/inference"),
        ))
        .expect("construction");
        assert!(transcriber.is_none());
    }

    #[test]
    fn enabled_config_without_endpoint_yields_no_transcriber() {
        let transcriber =
            HttpTranscriber::from_config(&speech_config(true, None)).expect("construction");
        assert!(transcriber.is_none());
    }

    #[test]
    fn enabled_config_with_endpoint_yields_transcriber() {
        let transcriber = HttpTranscriber::from_config(&speech_config(
            true,
            Some("http://localhost:9000/inference"),
        ))
        .expect("construction");
        assert!(transcriber.is_some());
    }
}
