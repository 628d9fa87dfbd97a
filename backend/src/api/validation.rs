//! Shared input validation helpers.
//!
//! Centralizes contract-input rules used by the analysis handler so the
//! form-level constraints (minimum text length, accepted document types)
//! are defined in one place.

use base64::Engine;

use crate::error::{AppError, Result};

/// Minimum contract text length, matching the submission form rule.
pub const MIN_CONTRACT_CHARS: usize = 50;

/// Document types accepted for uploaded contracts.
pub const ALLOWED_ATTACHMENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/webp",
    "text/plain",
];

/// Validate pasted contract text. Returns the trimmed text.
pub fn validate_contract_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_CONTRACT_CHARS {
        return Err(AppError::Validation(format!(
            "Contract text must be at least {} characters",
            MIN_CONTRACT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate an uploaded contract document: accepted MIME type and
/// well-formed, non-empty base64 payload.
pub fn validate_attachment(mime_type: &str, data: &str) -> Result<()> {
    if !ALLOWED_ATTACHMENT_TYPES.contains(&mime_type) {
        return Err(AppError::Validation(format!(
            "Unsupported document type '{}'",
            mime_type
        )));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|_| AppError::Validation("Document data is not valid base64".to_string()))?;

    if decoded.is_empty() {
        return Err(AppError::Validation("Document data is empty".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Contract text
    // -----------------------------------------------------------------------

    #[test]
    fn test_accepts_text_at_minimum_length() {
        let text = "x".repeat(MIN_CONTRACT_CHARS);
        assert_eq!(validate_contract_text(&text).unwrap(), text);
    }

    #[test]
    fn test_rejects_text_below_minimum() {
        let text = "x".repeat(MIN_CONTRACT_CHARS - 1);
        assert!(validate_contract_text(&text).is_err());
    }

    #[test]
    fn test_length_is_measured_after_trimming() {
        let padded = format!("   {}   ", "x".repeat(MIN_CONTRACT_CHARS - 1));
        assert!(validate_contract_text(&padded).is_err());
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let text = format!("  {}  ", "x".repeat(60));
        assert_eq!(validate_contract_text(&text).unwrap(), "x".repeat(60));
    }

    #[test]
    fn test_rejects_empty_text() {
        assert!(validate_contract_text("").is_err());
        assert!(validate_contract_text("   \n\t ").is_err());
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        // 50 multibyte chars are enough even though the byte length is larger
        let text = "ç".repeat(MIN_CONTRACT_CHARS);
        assert!(validate_contract_text(&text).is_ok());
    }

    // -----------------------------------------------------------------------
    // Attachments
    // -----------------------------------------------------------------------

    #[test]
    fn test_accepts_pdf_attachment() {
        assert!(validate_attachment("application/pdf", "aGVsbG8=").is_ok());
    }

    #[test]
    fn test_accepts_image_attachments() {
        for mime in ["image/png", "image/jpeg", "image/webp"] {
            assert!(validate_attachment(mime, "aGVsbG8=").is_ok(), "{}", mime);
        }
    }

    #[test]
    fn test_rejects_unsupported_mime() {
        assert!(validate_attachment("application/zip", "aGVsbG8=").is_err());
        assert!(validate_attachment("video/mp4", "aGVsbG8=").is_err());
        assert!(validate_attachment("", "aGVsbG8=").is_err());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(validate_attachment("application/pdf", "not base64 !!!").is_err());
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(validate_attachment("application/pdf", "").is_err());
    }

    #[test]
    fn test_error_message_names_the_type() {
        let err = validate_attachment("application/zip", "aGVsbG8=").unwrap_err();
        assert!(format!("{}", err).contains("application/zip"));
    }
}
