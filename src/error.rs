//! Error and result types shared by the parser, evaluator, and store.

use crate::span::Span;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostic codes emitted during parsing (spec §6): `CYP1xx` syntax,
/// `CYP2xx` feature-gate, `CYP3xx` semantic, `CYP9xx` internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CypCode {
    UnexpectedTokens,
    UnknownKeyword,
    ExistsSubqueryDisabled,
    CallInTransactionsDisabled,
    PatternComprehensionDisabled,
    UseClauseDisabled,
    InvalidOrdering,
    DuplicateAlias,
    DuplicateReturn,
    Internal,
}

impl CypCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CypCode::UnexpectedTokens => "CYP100",
            CypCode::UnknownKeyword => "CYP101",
            CypCode::ExistsSubqueryDisabled => "CYP201",
            CypCode::CallInTransactionsDisabled => "CYP202",
            CypCode::PatternComprehensionDisabled => "CYP203",
            CypCode::UseClauseDisabled => "CYP204",
            CypCode::InvalidOrdering => "CYP300",
            CypCode::DuplicateAlias => "CYP301",
            CypCode::DuplicateReturn => "CYP302",
            CypCode::Internal => "CYP900",
        }
    }
}

impl fmt::Display for CypCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parse-time diagnostic, accumulated by the collector rather than
/// aborting the whole parse (unless `recover_errors` is false).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: CypCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: CypCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        // Every diagnostic this crate emits is an error; there are no
        // warning-level codes in the CYPxxx ranges used here.
        true
    }
}

/// Graph store constraint violations (spec §4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    UnknownEndpoint,
    UnknownEntity,
    StillConnected(u64),
    UnsupportedPropertyValue,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownEndpoint => write!(f, "relationship endpoint does not exist"),
            StoreError::UnknownEntity => write!(f, "no entity with that id exists"),
            StoreError::StillConnected(id) => write!(
                f,
                "Cannot delete node {id} while it still has relationships"
            ),
            StoreError::UnsupportedPropertyValue => {
                write!(f, "property values cannot be a node, relationship, or path")
            }
        }
    }
}

/// The crate-wide error type. `Parse` carries a diagnostic code so the
/// public `parse()` wrapper can surface it alongside its span; `Runtime`
/// variants carry the stable message fragments documented in spec.md §7.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(Diagnostic),
    Store(StoreError),
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn parse(code: CypCode, message: impl Into<String>, span: Span) -> Self {
        Error::Parse(Diagnostic::new(code, message, span))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(d) => write!(f, "{}: {}", d.code, d.message),
            Error::Store(e) => write!(f, "{e}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}
