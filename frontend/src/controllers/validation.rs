use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Why a field was rejected. The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("This field is required")]
    Required,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Minimum {0} characters required")]
    TooShort(usize),
    #[error("Maximum {0} characters allowed")]
    TooLong(usize),
}

/// Constraints declared on a field's markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRules {
    pub required: bool,
    pub email: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl FieldRules {
    /// Builds rules from raw attribute values. Length bounds are read from
    /// their leading digits (`"3px"` is 3); bounds without any are ignored.
    pub fn from_attributes(
        required: bool,
        field_type: &str,
        min_length: Option<&str>,
        max_length: Option<&str>,
    ) -> Self {
        Self {
            required,
            email: field_type.eq_ignore_ascii_case("email"),
            min_length: min_length.and_then(leading_number),
            max_length: max_length.and_then(leading_number),
        }
    }

    /// Checks `raw` against the rules, reporting the first failure only.
    pub fn check(&self, raw: &str) -> Result<(), FieldError> {
        let value = raw.trim_matches(is_blank);

        if self.required && value.is_empty() {
            return Err(FieldError::Required);
        }
        if self.email && !value.is_empty() && !is_email(value) {
            return Err(FieldError::InvalidEmail);
        }

        // Browsers measure field length in UTF-16 code units.
        let len = value.encode_utf16().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(FieldError::TooShort(min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(FieldError::TooLong(max));
            }
        }
        Ok(())
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Whitespace as browsers trim it, which includes the byte order mark.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

fn leading_number(raw: &str) -> Option<usize> {
    let digits = raw.trim_start_matches(is_blank);
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
