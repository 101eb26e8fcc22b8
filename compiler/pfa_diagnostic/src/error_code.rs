use std::fmt;

/// Error codes for all construction-time diagnostics.
///
/// Format: E#### where first digit indicates the kind:
/// - E1xxx: Syntax errors (malformed document shape)
/// - E2xxx: Schema errors (ill-formed type declarations)
/// - E3xxx: Semantic errors (names, signatures, types)
/// - E4xxx: Initialization errors (bad options)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Syntax Errors (E1xxx)
    /// Document is not an object
    E1001,
    /// Missing required field
    E1002,
    /// Unknown top-level field
    E1003,
    /// Unrecognized expression form
    E1004,
    /// Form argument has the wrong shape
    E1005,
    /// Invalid literal
    E1006,
    /// Invalid function definition
    E1007,
    /// Unknown method
    E1008,

    // Schema Errors (E2xxx)
    /// Malformed type declaration
    E2001,
    /// Unknown named type
    E2002,
    /// Duplicate named type
    E2003,
    /// Invalid union
    E2004,
    /// Recursive named type
    E2005,
    /// Invalid name or enum symbol
    E2006,
    /// Function type outside a parameter position
    E2007,

    // Semantic Errors (E3xxx)
    /// Unknown symbol
    E3001,
    /// Unknown function
    E3002,
    /// No matching signature
    E3003,
    /// Type mismatch
    E3004,
    /// Unknown cell or pool
    E3005,
    /// Invalid path
    E3006,
    /// Symbol already defined in scope
    E3007,
    /// Assignment to a read-only symbol
    E3008,
    /// Value does not decode as its declared type
    E3009,
    /// Cell or pool access inside an update function
    E3010,
    /// Invalid cast case
    E3011,
    /// Form not available with this method or in this block
    E3012,
    /// Duplicate definition
    E3013,
    /// Invalid function reference
    E3014,
    /// Assignment to a captured variable
    E3015,

    // Initialization Errors (E4xxx)
    /// Invalid option value
    E4001,
    /// Invalid random seed
    E4002,
}

/// Kind of a construction-time failure.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    Syntax,
    Schema,
    Semantic,
    Initialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Schema => write!(f, "schema error"),
            ErrorKind::Semantic => write!(f, "semantic error"),
            ErrorKind::Initialization => write!(f, "initialization error"),
        }
    }
}

impl ErrorCode {
    /// Kind implied by the code's range.
    pub fn kind(&self) -> ErrorKind {
        match self.as_str().as_bytes()[1] {
            b'1' => ErrorKind::Syntax,
            b'2' => ErrorKind::Schema,
            b'3' => ErrorKind::Semantic,
            _ => ErrorKind::Initialization,
        }
    }

    /// Get the numeric code as a string (e.g., "E1001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Syntax
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E1008 => "E1008",
            // Schema
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            // Semantic
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E3007 => "E3007",
            ErrorCode::E3008 => "E3008",
            ErrorCode::E3009 => "E3009",
            ErrorCode::E3010 => "E3010",
            ErrorCode::E3011 => "E3011",
            ErrorCode::E3012 => "E3012",
            ErrorCode::E3013 => "E3013",
            ErrorCode::E3014 => "E3014",
            ErrorCode::E3015 => "E3015",
            // Initialization
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E1001.to_string(), "E1001");
        assert_eq!(ErrorCode::E3003.as_str(), "E3003");
    }

    #[test]
    fn test_error_kind_from_range() {
        assert_eq!(ErrorCode::E1004.kind(), ErrorKind::Syntax);
        assert_eq!(ErrorCode::E2005.kind(), ErrorKind::Schema);
        assert_eq!(ErrorCode::E3003.kind(), ErrorKind::Semantic);
        assert_eq!(ErrorCode::E4001.kind(), ErrorKind::Initialization);
    }
}
