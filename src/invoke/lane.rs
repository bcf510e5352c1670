//! Modality classification for attachments.
//!
//! Every extension maps to exactly one lane; classification never fails.
//! The document lane is the default, and its own allowlist (what the
//! backend will actually index) is enforced inside that lane, not here.

/// Audio formats the transcription endpoint accepts.
pub const AUDIO_FORMATS: [&str; 7] = [
    ".mp3", ".mp4", ".mpeg", ".mpga", ".m4a", ".wav", ".webm",
];

/// Image formats the vision path sends inline.
pub const IMAGE_FORMATS: [&str; 5] = [".png", ".jpeg", ".jpg", ".webp", ".gif"];

/// Document formats the retrieval backend can index.
pub const SUPPORTED_DOCUMENT_FORMATS: [&str; 29] = [
    ".c", ".cpp", ".css", ".csv", ".docx", ".gif", ".go", ".html", ".java", ".jpeg", ".jpg",
    ".js", ".json", ".md", ".pdf", ".php", ".pkl", ".png", ".pptx", ".py", ".rb", ".tar", ".tex",
    ".ts", ".txt", ".webp", ".xlsx", ".xml", ".zip",
];

/// The three invocation lanes an attachment can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Audio,
    Image,
    Document,
}

impl Lane {
    /// Map an extension (lowercased, leading dot) to its lane.
    ///
    /// Total: anything not audio or image is a document, including the
    /// empty extension.
    pub fn classify(extension: &str) -> Lane {
        let ext = extension.to_lowercase();
        if AUDIO_FORMATS.contains(&ext.as_str()) {
            Lane::Audio
        } else if IMAGE_FORMATS.contains(&ext.as_str()) {
            Lane::Image
        } else {
            Lane::Document
        }
    }
}

/// Whether the retrieval backend accepts this document format.
pub fn is_supported_document(extension: &str) -> bool {
    SUPPORTED_DOCUMENT_FORMATS.contains(&extension.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_audio_format_classifies_audio() {
        for ext in AUDIO_FORMATS {
            assert_eq!(Lane::classify(ext), Lane::Audio, "{ext}");
        }
    }

    #[test]
    fn test_every_image_format_classifies_image() {
        for ext in IMAGE_FORMATS {
            assert_eq!(Lane::classify(ext), Lane::Image, "{ext}");
        }
    }

    #[test]
    fn test_unlisted_extensions_are_documents() {
        for ext in [".docx", ".pdf", ".xlsx", ".exe", ".tar", "", ".unknown"] {
            assert_eq!(Lane::classify(ext), Lane::Document, "{ext:?}");
        }
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(Lane::classify(".MP3"), Lane::Audio);
        assert_eq!(Lane::classify(".Png"), Lane::Image);
    }

    #[test]
    fn test_audio_and_image_sets_are_disjoint() {
        for ext in AUDIO_FORMATS {
            assert!(!IMAGE_FORMATS.contains(&ext));
        }
    }

    #[test]
    fn test_document_allowlist() {
        assert!(is_supported_document(".docx"));
        assert!(is_supported_document(".XLSX"));
        assert!(!is_supported_document(".exe"));
        assert!(!is_supported_document(".mp3"));
        assert!(!is_supported_document(""));
    }
}
