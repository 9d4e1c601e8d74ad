//! Sentence-granularity text chunking.

use crate::types::Segment;
use unicode_segmentation::UnicodeSegmentation;

/// Segments whose trimmed length (in characters) is at or below this are noise.
pub const MIN_SEGMENT_CHARS: usize = 20;

/// Split text into sentence segments using Unicode sentence boundaries (UAX #29).
///
/// Each segment is trimmed. Segments of `MIN_SEGMENT_CHARS` characters or fewer
/// are dropped, and `sequence_id` counts only the segments that survive.
pub fn chunk_text(text: &str) -> Vec<Segment> {
    let segments: Vec<Segment> = text
        .unicode_sentences()
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > MIN_SEGMENT_CHARS)
        .enumerate()
        .map(|(position, sentence)| Segment {
            sequence_id: position as u32,
            text: sentence.to_string(),
        })
        .collect();

    tracing::debug!(
        "Chunked {} bytes into {} sentence segments",
        text.len(),
        segments.len()
    );

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_sentences() {
        let text = "The cat sat on the mat. The dog ran in the park. \
                    Elephants are large mammals that live in herds.";
        let segments = chunk_text(text);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "The cat sat on the mat.");
        assert_eq!(segments[1].text, "The dog ran in the park.");
        assert_eq!(
            segments[2].text,
            "Elephants are large mammals that live in herds."
        );
        assert_eq!(segments[2].sequence_id, 2);
    }

    #[test]
    fn test_chunk_text_boundary() {
        assert_eq!("Exactly twenty chars".chars().count(), 20);
        assert!(chunk_text("Exactly twenty chars").is_empty());

        let segments = chunk_text("Exactly twenty chars.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text.chars().count(), 21);
    }

    #[test]
    fn test_sequence_ids_count_survivors_only() {
        let text = "Hi. This sentence is long enough to keep. Ok. \
                    Another sentence that survives the filter.";
        let segments = chunk_text(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].sequence_id, 0);
        assert_eq!(segments[1].sequence_id, 1);
        assert_eq!(segments[1].text, "Another sentence that survives the filter.");
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n\t ").is_empty());
    }

    #[test]
    fn test_length_measured_in_chars_not_bytes() {
        // 15 characters but more than 20 bytes
        let short = "Ça été été été.";
        assert!(short.len() > MIN_SEGMENT_CHARS);
        assert!(chunk_text(short).is_empty());
    }

    #[test]
    fn test_paragraph_breaks_split_segments() {
        let text = "First line without a full stop\nSecond line also lacking one";
        let segments = chunk_text(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "First line without a full stop");
    }
}
