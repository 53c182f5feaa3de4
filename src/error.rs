//! Typed errors for every compilation stage.
//!
//! Each stage fails fast with exactly one error. Errors carrying a source
//! position convert into a [`Diagnostic`] for ariadne rendering.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A character the lexer could not classify, or a malformed literal.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub ch: char,
    pub message: String,
}

impl LexError {
    pub fn unexpected(ch: char, span: Span) -> Self {
        Self {
            span,
            ch,
            message: format!("unexpected character {:?}", ch),
        }
    }
}

/// A token that does not fit the grammar at its position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ParseError {
    pub span: Span,
    pub expected: String,
    pub found: String,
}

/// Semantic failure while lowering CoinScript into tree programs.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct GenerationError {
    pub span: Span,
    pub kind: GenerationErrorKind,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, span: Span) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationErrorKind {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{object}` has no member `{field}`")]
    UnknownMember { object: String, field: String },
    #[error("cannot assign to undeclared variable `{0}`")]
    UndeclaredAssignment(String),
    #[error("cannot assign to immutable binding `{0}`")]
    ImmutableAssignment(String),
    #[error("`state.{0}` is only available inside @stateful actions")]
    StateOutsideStateful(String),
    #[error("unknown decorator `@{0}`")]
    UnknownDecorator(String),
    #[error("decorator `@{decorator}` cannot be applied to {target}")]
    BadDecoratorTarget { decorator: String, target: String },
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("`{name}` takes {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("`{0}` produces a condition and is only allowed in action bodies")]
    ConditionOutsideAction(String),
    #[error("`{0}` is declared more than once")]
    Duplicate(String),
    #[error("expression too deep (limit is {0} levels)")]
    TooDeep(u32),
    #[error("invalid address literal `{0}`")]
    InvalidAddress(String),
    #[error("storage `{0}` must be initialized with a literal")]
    NonLiteralStorage(String),
    #[error("modifier `{name}` must contain exactly one `_;` placeholder, found {found}")]
    Placeholder { name: String, found: usize },
    #[error("coin `{0}` declares no actions")]
    NoActions(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Malformed Tree IR text, bytes, or special forms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("at byte {position}: expected {expected}")]
    Parse { position: usize, expected: String },
    #[error("at byte {position}: nesting deeper than {limit} levels")]
    TooDeep { position: usize, limit: usize },
    #[error("malformed `{form}` form: {reason}")]
    Conversion { form: String, reason: String },
    #[error("invalid serialized tree at byte {position}: {reason}")]
    Bytes { position: usize, reason: String },
}

/// Failures building the action merkle tree or a stateful spend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("a stateful coin needs at least one action")]
    NoActions,
    #[error("no action named `{0}` is committed to this coin")]
    UnknownAction(String),
    #[error("state has {found} field(s), schema declares {expected}")]
    StateArity { expected: usize, found: usize },
    #[error("state tuple is not a proper list: {0}")]
    MalformedState(String),
    #[error("action `{action}` takes {expected} argument(s), found {found}")]
    ArgCount {
        action: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Solution(#[from] SolutionError),
}

/// Solution arguments that do not match a program's declared parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolutionError {
    #[error("program has no solution parameter `{0}`")]
    UnknownParameter(String),
    #[error("no value supplied for solution parameter `{0}`")]
    MissingArgument(String),
}

/// An external bytecode compiler rejected a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("bytecode compiler failed: {0}")]
pub struct BackendError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Generate(#[from] GenerationError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Solution(#[from] SolutionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    /// Source span of the error, for stages that track one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex(e) => Some(e.span),
            Error::Parse(e) => Some(e.span),
            Error::Generate(e) => Some(e.span),
            Error::Tree(TreeError::Parse { position, .. })
            | Error::Tree(TreeError::TooDeep { position, .. }) => {
                Some(Span::new(0, *position as u32, *position as u32 + 1))
            }
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.span().unwrap_or_else(Span::dummy);
        let diag = Diagnostic::error(self.to_string(), span);
        match self {
            Error::Lex(_) => diag.with_help(
                "CoinScript source is ASCII: identifiers, numbers, strings, operators and braces"
                    .to_string(),
            ),
            Error::Generate(GenerationError {
                kind: GenerationErrorKind::StateOutsideStateful(_),
                ..
            }) => diag.with_help("mark the action with `@stateful`".to_string()),
            Error::Generate(GenerationError {
                kind: GenerationErrorKind::TooDeep(_),
                ..
            }) => diag.with_help(
                "split deeply nested expressions into local variables or functions".to_string(),
            ),
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;

    #[test]
    fn test_generation_error_to_diagnostic() {
        let err: Error = GenerationError::new(
            GenerationErrorKind::StateOutsideStateful("count".into()),
            Span::new(0, 4, 9),
        )
        .into();
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "`state.count` is only available inside @stateful actions");
        assert_eq!((diag.span.start, diag.span.end), (4, 9));
        assert_eq!(diag.help.as_deref(), Some("mark the action with `@stateful`"));
    }

    #[test]
    fn test_tree_parse_error_points_at_byte() {
        let err: Error = TreeError::Parse {
            position: 7,
            expected: "')'".into(),
        }
        .into();
        assert_eq!(err.span(), Some(Span::new(0, 7, 8)));
        assert_eq!(err.to_string(), "at byte 7: expected ')'");
    }

    #[test]
    fn test_layer_errors_have_no_span() {
        let err: Error = LayerError::UnknownAction("mint".into()).into();
        assert_eq!(err.span(), None);
        assert_eq!(err.to_diagnostic().span, Span::dummy());
    }

    #[test]
    fn test_arity_message() {
        let kind = GenerationErrorKind::ArityMismatch {
            name: "substr".into(),
            expected: "2 to 3".into(),
            found: 1,
        };
        assert_eq!(kind.to_string(), "`substr` takes 2 to 3 argument(s), found 1");
    }
}
