//! Line marker tokens
//!
//! Only the start of a line is significant in the dialect: a heading, a field marker, a
//! metadata caret or a front matter fence. The logos lexer recognizes that leading marker and
//! the classifier looks at what remains of the line.
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
pub enum Marker {
    #[token("---")]
    Fence,

    #[regex(r"#+")]
    Hashes,

    #[token("@field:")]
    FieldOpen,

    #[token("@end_field")]
    FieldClose,

    #[token("@@field:")]
    NestedOpen,

    #[token("@@end_field")]
    NestedClose,

    #[token("@subfield:")]
    LegacyNestedOpen,

    #[token("@end_subfield")]
    LegacyNestedClose,

    #[regex(r"\^[A-Za-z][A-Za-z0-9_\-]*")]
    Caret,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(line: &str) -> Option<(Marker, &str, &str)> {
        let mut lexer = Marker::lexer(line);
        match lexer.next() {
            Some(Ok(marker)) => Some((marker, lexer.slice(), lexer.remainder())),
            _ => None,
        }
    }

    #[test]
    fn recognizes_field_markers() {
        assert_eq!(first("@field: options").map(|t| t.0), Some(Marker::FieldOpen));
        assert_eq!(first("@@field: blank_1").map(|t| t.0), Some(Marker::NestedOpen));
        assert_eq!(first("@end_field").map(|t| t.0), Some(Marker::FieldClose));
        assert_eq!(first("@@end_field").map(|t| t.0), Some(Marker::NestedClose));
        assert_eq!(first("@subfield: x").map(|t| t.0), Some(Marker::LegacyNestedOpen));
        assert_eq!(first("@end_subfield").map(|t| t.0), Some(Marker::LegacyNestedClose));
    }

    #[test]
    fn caret_slice_and_remainder() {
        let (marker, slice, rest) = first("^Correct_Answer: photosynthesis").unwrap();
        assert_eq!(marker, Marker::Caret);
        assert_eq!(slice, "^Correct_Answer");
        assert_eq!(rest, ": photosynthesis");
    }

    #[test]
    fn plain_text_has_no_marker() {
        assert_eq!(first("Which organelle?"), None);
        assert_eq!(first("^2 is a power"), None);
    }

    #[test]
    fn hashes_are_counted_by_slice() {
        let (marker, slice, rest) = first("## Question 2").unwrap();
        assert_eq!(marker, Marker::Hashes);
        assert_eq!(slice, "##");
        assert_eq!(rest, " Question 2");
    }
}
