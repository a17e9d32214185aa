use validator::{ValidateEmail, ValidationError};

/// Email address type. Once constructed, guaranteed to be trimmed and syntactically valid.
/// Case is preserved so reply-to addresses echo exactly what the submitter typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Create a new Email from a string. Trims whitespace and validates format.
    /// Returns an error if the email format is invalid.
    pub fn new(email: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into();
        let trimmed = email.trim();

        // Maximum email length per RFC 5321
        if trimmed.len() > 254 {
            let mut error = ValidationError::new("email_too_long");
            error.message = Some("Email address is too long".into());
            return Err(error);
        }

        if trimmed.validate_email() {
            Ok(Self(trimmed.to_string()))
        } else {
            let mut error = ValidationError::new("invalid_email");
            error.message = Some("Invalid email address format".into());
            Err(error)
        }
    }

    /// Parse a comma-separated list of addresses. Blank entries are skipped.
    /// Returns the first offending entry on failure.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| Self::new(entry).map_err(|_| entry.to_string()))
            .collect()
    }

    /// Get the email as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
