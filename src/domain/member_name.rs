use unicode_segmentation::UnicodeSegmentation;

const FORBIDDEN_CHARACTERS: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

#[derive(Debug, Clone)]
pub struct MemberName(String);

impl MemberName {
    /// Accepts names that are non-blank, at most 256 graphemes long and
    /// free of characters commonly used in markup or injection payloads.
    pub fn parse(s: String) -> Result<MemberName, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let is_too_long = s.graphemes(true).count() > 256;
        let contains_forbidden_characters = s
            .chars()
            .any(|g| FORBIDDEN_CHARACTERS.contains(&g));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
            Err(format!("{} is not a valid member name.", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for MemberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
