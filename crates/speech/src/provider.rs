use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Failure taxonomy for the transcription boundary. These surface as values;
/// the dialogue treats any of them as "no input received" and re-prompts. The
/// error text itself must never be fed to the field extractors.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription service is unavailable: {0}")]
    Unavailable(String),
    #[error("audio could not be decoded: {0}")]
    Decode(String),
    #[error("no speech was detected in the audio")]
    NoSpeech,
    #[error("transcription request failed: {0}")]
    Request(String),
}

/// One audio clip to transcribe: original file name plus raw bytes.
#[derive(Clone, Debug)]
pub struct AudioSource {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioSource {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes }
    }

    pub async fn from_file(path: &Path) -> Result<Self, TranscribeError> {
        let bytes = tokio::fs::read(path).await.map_err(|error| {
            TranscribeError::Decode(format!("could not read `{}`: {error}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        Ok(Self { file_name, bytes })
    }
}

/// Optional capability converting audio into text. Constructed only when the
/// speech section of the configuration is enabled; surfaces query presence
/// rather than branching on anything global.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, audio: &AudioSource) -> Result<String, TranscribeError>;
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{AudioSource, TranscribeError};

    #[tokio::test]
    async fn audio_source_reads_file_bytes_and_name() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("clip.wav");
        let mut file = std::fs::File::create(&path).expect("create file");
        file.write_all(b"RIFF....WAVE").expect("write bytes");

        let source = AudioSource::from_file(&path).await.expect("read audio");
        assert_eq!(source.file_name, "clip.wav");
        assert_eq!(source.bytes, b"RIFF....WAVE");
    }

    #[tokio::test]
    async fn missing_file_surfaces_as_decode_failure() {
        let error = AudioSource::from_file(&PathBuf::from("/nonexistent/clip.wav"))
            .await
            .expect_err("missing file");
        assert!(matches!(error, TranscribeError::Decode(_)));
    }

    #[test]
    fn error_messages_are_user_presentable() {
        assert_eq!(
            TranscribeError::NoSpeech.to_string(),
            "no speech was detected in the audio"
        );
        assert!(TranscribeError::Unavailable("connection refused".to_string())
            .to_string()
            .contains("unavailable"));
    }
}
