use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// An error that can occur when generating Elm sources from a
/// `CodeGeneratorRequest`.
///
/// All errors are fatal to the invocation: no output files are produced if
/// any file fails to resolve or lower.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("name '{type_name}' referenced by field '{field}' in '{file}' is not defined")]
    #[diagnostic(help(
        "make sure the file declaring '{type_name}' is part of the descriptor set passed to protoc"
    ))]
    UnresolvedReference {
        field: String,
        type_name: String,
        file: String,
    },
    #[error("declarations in {scope} collapse to the same Elm name '{name}'")]
    #[diagnostic(help("rename one of the conflicting declarations in the schema"))]
    NameCollision { scope: String, name: String },
    #[error("{construct} in '{file}' has no Elm lowering")]
    UnsupportedConstruct { construct: String, file: String },
    #[error("malformed code generator request: {reason}")]
    MalformedRequest { reason: String },
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::from_kind(ErrorKind::MalformedRequest {
            reason: reason.into(),
        })
    }

    /// The file in which this error occurred, if known.
    pub fn file(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::UnresolvedReference { file, .. }
            | ErrorKind::UnsupportedConstruct { file, .. } => Some(file),
            ErrorKind::NameCollision { .. } | ErrorKind::MalformedRequest { .. } => None,
        }
    }

    /// Returns true if this error is caused by a type reference that could
    /// not be resolved within the descriptor closure.
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(&*self.kind, ErrorKind::UnresolvedReference { .. })
    }

    /// Returns true if this error is caused by a structurally invalid request.
    pub fn is_malformed_request(&self) -> bool {
        matches!(&*self.kind, ErrorKind::MalformedRequest { .. })
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[test]
fn fmt_unresolved_reference() {
    let err = Error::from_kind(ErrorKind::UnresolvedReference {
        field: "bar".to_owned(),
        type_name: ".foo.Bar".to_owned(),
        file: "foo.proto".to_owned(),
    });

    assert!(err.is_unresolved_reference());
    assert_eq!(err.file(), Some("foo.proto"));
    assert_eq!(
        format!("{:?}", err),
        "name '.foo.Bar' referenced by field 'bar' in 'foo.proto' is not defined"
    );
}

#[test]
fn fmt_malformed_request() {
    let err = Error::malformed("duplicate field number 1 in message 'Foo'");

    assert!(err.is_malformed_request());
    assert_eq!(err.file(), None);
    assert_eq!(
        err.to_string(),
        "malformed code generator request: duplicate field number 1 in message 'Foo'"
    );
}
