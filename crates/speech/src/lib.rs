//! Optional speech-to-text capability. The rest of the application depends
//! only on the [`TranscriptionProvider`] trait; the HTTP implementation is
//! constructed from configuration when the capability is enabled.

pub mod http;
pub mod provider;

pub use http::HttpTranscriber;
pub use provider::{AudioSource, TranscribeError, TranscriptionProvider};
