use std::fmt;

/// How a document is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Create a new document; the target must not exist.
    Create,
    /// Remove any existing target, then create.
    Recreate,
    /// Open an existing document for writing, creating it when absent.
    Update,
    /// Open an existing document read-only.
    #[default]
    Read,
}

impl OpenMode {
    /// Parse a mode option, ignoring case.
    ///
    /// `NEW` is accepted for `CREATE`; anything unrecognized opens for reading.
    pub fn parse(option: &str) -> Self {
        match option.trim().to_ascii_uppercase().as_str() {
            "CREATE" | "NEW" => Self::Create,
            "RECREATE" => Self::Recreate,
            "UPDATE" => Self::Update,
            _ => Self::Read,
        }
    }

    /// Whether the mode allows writing.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Recreate => "RECREATE",
            Self::Update => "UPDATE",
            Self::Read => "READ",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OpenMode {
    fn from(option: &str) -> Self {
        Self::parse(option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(OpenMode::parse("create"), OpenMode::Create);
        assert_eq!(OpenMode::parse("ReCreate"), OpenMode::Recreate);
        assert_eq!(OpenMode::parse("UPDATE"), OpenMode::Update);
        assert_eq!(OpenMode::parse("read"), OpenMode::Read);
    }

    #[test]
    fn new_is_create() {
        assert_eq!(OpenMode::parse("new"), OpenMode::Create);
    }

    #[test]
    fn unknown_defaults_to_read() {
        assert_eq!(OpenMode::parse(""), OpenMode::Read);
        assert_eq!(OpenMode::parse("append"), OpenMode::Read);
        assert_eq!(OpenMode::default(), OpenMode::Read);
    }

    #[test]
    fn writable_modes() {
        assert!(OpenMode::Create.is_writable());
        assert!(OpenMode::Recreate.is_writable());
        assert!(OpenMode::Update.is_writable());
        assert!(!OpenMode::Read.is_writable());
        assert_eq!(OpenMode::Update.to_string(), "UPDATE");
    }
}
