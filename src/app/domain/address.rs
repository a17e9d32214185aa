use std::fmt;

/// A mailbox as it appears in From / Reply-To headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub email: String,
    pub name: Option<String>,
}

impl Address {
    /// Build an address. Empty or whitespace-only names are dropped.
    pub fn new(email: impl Into<String>, name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Self {
            email: email.into(),
            name,
        }
    }
}

impl fmt::Display for Address {
    /// `name <email>` when a name is present, else the bare email.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => f.write_str(&self.email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_address() {
        assert_eq!(Address::new("a@x.com", Some("Ann")).to_string(), "Ann <a@x.com>");
    }

    #[test]
    fn empty_name_is_bare_email() {
        assert_eq!(Address::new("a@x.com", Some("  ")).to_string(), "a@x.com");
        assert_eq!(Address::new("a@x.com", None).to_string(), "a@x.com");
    }
}
