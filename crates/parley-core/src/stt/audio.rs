//! Audio upload checks done before any bytes leave the process.

use parley_types::config::WhisperConfig;
use parley_types::transcription::{AudioMetadata, TranscriptionError};

/// Lowercased extension after the last `.`, or empty.
pub fn audio_format(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Check format, size and emptiness of an upload, in that order.
pub fn validate_audio(
    data: &[u8],
    filename: &str,
    config: &WhisperConfig,
) -> Result<AudioMetadata, TranscriptionError> {
    let format = audio_format(filename);
    if !config.supported_formats.iter().any(|f| *f == format) {
        return Err(TranscriptionError::Validation(format!(
            "Unsupported audio format: {format}. Supported formats: {}",
            config.supported_formats.join(", ")
        )));
    }

    let size = data.len() as u64;
    if size > config.max_file_size_bytes() {
        return Err(TranscriptionError::Validation(format!(
            "Audio file too large: {:.1}MB. Maximum allowed: {}MB",
            size as f64 / 1024.0 / 1024.0,
            config.max_file_size_mb
        )));
    }
    if size == 0 {
        return Err(TranscriptionError::Validation("Audio file is empty".to_string()));
    }

    Ok(AudioMetadata {
        filename: filename.to_string(),
        size_bytes: data.len(),
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_lowercased_extension() {
        assert_eq!(audio_format("voice.MP3"), "mp3");
        assert_eq!(audio_format("archive.tar.webm"), "webm");
        assert_eq!(audio_format("noext"), "");
    }

    #[test]
    fn accepts_supported_upload() {
        let meta = validate_audio(b"RIFF....", "clip.wav", &WhisperConfig::default()).unwrap();
        assert_eq!(meta.format, "wav");
        assert_eq!(meta.size_bytes, 8);
    }

    #[test]
    fn rejects_unsupported_format() {
        let err = validate_audio(b"x", "notes.txt", &WhisperConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Unsupported audio format: txt. Supported formats: "));
        assert!(msg.contains("mp3"));
        assert_eq!(err.code(), "INVALID_AUDIO");
    }

    #[test]
    fn rejects_oversize_and_empty() {
        let config = WhisperConfig {
            max_file_size_mb: 1,
            ..Default::default()
        };
        let big = vec![0u8; 1024 * 1024 + 200_000];
        let err = validate_audio(&big, "a.mp3", &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Audio file too large: 1.2MB. Maximum allowed: 1MB"
        );

        let err = validate_audio(&[], "a.mp3", &config).unwrap_err();
        assert_eq!(err.to_string(), "Audio file is empty");
    }
}
