//! Compile-time and run-time errors.
//!
//! Both error types carry a stable [`ErrorCode`] and an optional source
//! location, and convert into a [`Diagnostic`] for rendering. The free
//! functions below are the only constructors used by the compilers and
//! interpreters, so every message is worded in one place.

use std::fmt;

use kmk_diagnostic::{Diagnostic, ErrorCode};
use kmk_ir::Location;

/// Fatal structural error found while compiling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompileError {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<Location>,
}

impl CompileError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CompileError {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location unless one is already set.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code)
            .with_message(self.message.clone())
            .at_opt(self.location.clone())
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for CompileError {}

// Expansion compiler

pub fn unterminated_reference(open: char, close: char) -> CompileError {
    CompileError::new(
        ErrorCode::K1001,
        format!("unterminated variable reference: '${open}' is missing its closing '{close}'"),
    )
}

pub fn too_few_arguments(function: &str, given: usize, min: usize) -> CompileError {
    CompileError::new(
        ErrorCode::K1002,
        format!(
            "insufficient number of arguments ({given}) to function '{function}': requires at least {min}"
        ),
    )
}

pub fn too_many_levels(limit: u32) -> CompileError {
    CompileError::new(
        ErrorCode::K1003,
        format!("too many levels of nested references (limit is {limit})"),
    )
}

// Directive compiler

pub fn missing_separator() -> CompileError {
    CompileError::new(ErrorCode::K2001, "missing separator")
}

pub fn missing_target() -> CompileError {
    CompileError::new(ErrorCode::K2001, "missing target before ':'")
}

pub fn missing_endif() -> CompileError {
    CompileError::new(ErrorCode::K2002, "missing 'endif'")
}

pub fn else_without_if() -> CompileError {
    CompileError::new(ErrorCode::K2003, "'else' without 'if'")
}

pub fn duplicate_else() -> CompileError {
    CompileError::new(ErrorCode::K2004, "only one 'else' per conditional")
}

pub fn endif_without_if() -> CompileError {
    CompileError::new(ErrorCode::K2005, "'endif' without 'if'")
}

pub fn too_deep_nesting(limit: usize) -> CompileError {
    CompileError::new(
        ErrorCode::K2006,
        format!("too deep if nesting (limit is {limit})"),
    )
}

pub fn extraneous_text(directive: &str) -> CompileError {
    CompileError::new(
        ErrorCode::K2007,
        format!("extraneous text after '{directive}' directive"),
    )
}

pub fn malformed_conditional(directive: &str, why: &str) -> CompileError {
    CompileError::new(ErrorCode::K2008, format!("malformed '{directive}': {why}"))
}

pub fn missing_endef() -> CompileError {
    CompileError::new(ErrorCode::K2009, "missing 'endef', unterminated 'define'")
}

pub fn extraneous_endef() -> CompileError {
    CompileError::new(ErrorCode::K2010, "extraneous 'endef'")
}

pub fn empty_variable_name() -> CompileError {
    CompileError::new(ErrorCode::K2011, "empty variable name")
}

pub fn unsupported(what: &str) -> CompileError {
    CompileError::new(ErrorCode::K2012, format!("{what} are not supported"))
}

pub fn qualifier_without_assignment(qualifier: &str) -> CompileError {
    CompileError::new(
        ErrorCode::K2013,
        format!("'{qualifier}' must be followed by a variable assignment"),
    )
}

/// What went wrong while running a program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvalErrorKind {
    /// A lazily compiled program failed to compile.
    Compile(CompileError),
    SelfReference { name: String },
    ProgramInFlight { name: String },
    ErrorFunction { message: String },
    IncludeNotFound { file: String },
    IncludeTooDeep { file: String, limit: u32 },
    NotBlank { text: String },
    BadIfExpression { message: String },
    BadArgument { function: &'static str, message: String },
    EmptyVariableName,
    ArgumentMutated { function: &'static str },
    ProgramInvalidated,
}

/// Fatal run-time error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub location: Option<Location>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError {
            kind,
            location: None,
        }
    }

    /// Attach a location unless one is already set.
    #[must_use]
    pub fn at_opt(mut self, location: Option<&Location>) -> Self {
        if self.location.is_none() {
            self.location = location.cloned();
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match &self.kind {
            EvalErrorKind::Compile(e) => e.code,
            EvalErrorKind::SelfReference { .. } => ErrorCode::K3002,
            EvalErrorKind::ProgramInFlight { .. } => ErrorCode::K3003,
            EvalErrorKind::ErrorFunction { .. } => ErrorCode::K3004,
            EvalErrorKind::IncludeNotFound { .. } => ErrorCode::K3005,
            EvalErrorKind::IncludeTooDeep { .. } => ErrorCode::K3006,
            EvalErrorKind::NotBlank { .. } => ErrorCode::K3007,
            EvalErrorKind::BadIfExpression { .. } => ErrorCode::K3008,
            EvalErrorKind::BadArgument { .. } => ErrorCode::K3010,
            EvalErrorKind::EmptyVariableName => ErrorCode::K3011,
            EvalErrorKind::ArgumentMutated { .. } => ErrorCode::K9001,
            EvalErrorKind::ProgramInvalidated => ErrorCode::K9002,
        }
    }

    fn effective_location(&self) -> Option<&Location> {
        match &self.kind {
            EvalErrorKind::Compile(e) if e.location.is_some() => e.location.as_ref(),
            _ => self.location.as_ref(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code())
            .with_message(self.message())
            .at_opt(self.effective_location().cloned())
    }

    pub fn message(&self) -> String {
        match &self.kind {
            EvalErrorKind::Compile(e) => e.message.clone(),
            EvalErrorKind::SelfReference { name } => {
                format!("Recursive variable '{name}' references itself (eventually)")
            }
            EvalErrorKind::ProgramInFlight { name } => {
                format!("variable '{name}' modified while its compiled program is executing")
            }
            EvalErrorKind::ErrorFunction { message } => message.clone(),
            EvalErrorKind::IncludeNotFound { file } => format!("{file}: No such file"),
            EvalErrorKind::IncludeTooDeep { file, limit } => {
                format!("{file}: include nesting exceeds {limit} levels")
            }
            EvalErrorKind::NotBlank { text } => {
                format!("missing separator: line expanded to '{text}'")
            }
            EvalErrorKind::BadIfExpression { message } => format!("malformed if expression: {message}"),
            EvalErrorKind::BadArgument { function, message } => {
                format!("{message} to '{function}' function")
            }
            EvalErrorKind::EmptyVariableName => "empty variable name".to_owned(),
            EvalErrorKind::ArgumentMutated { function } => {
                format!("internal error: function '{function}' modified an argument it does not own")
            }
            EvalErrorKind::ProgramInvalidated => {
                "internal error: program executed after invalidation".to_owned()
            }
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.effective_location() {
            Some(loc) => write!(f, "{loc}: {}", self.message()),
            None => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<CompileError> for EvalError {
    fn from(e: CompileError) -> Self {
        EvalError::new(EvalErrorKind::Compile(e))
    }
}

// Run time

pub fn self_reference(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::SelfReference {
        name: name.to_owned(),
    })
}

pub fn program_in_flight(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::ProgramInFlight {
        name: name.to_owned(),
    })
}

pub fn error_function(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::ErrorFunction {
        message: message.into(),
    })
}

pub fn include_not_found(file: &str) -> EvalError {
    EvalError::new(EvalErrorKind::IncludeNotFound {
        file: file.to_owned(),
    })
}

pub fn include_too_deep(file: &str, limit: u32) -> EvalError {
    EvalError::new(EvalErrorKind::IncludeTooDeep {
        file: file.to_owned(),
        limit,
    })
}

pub fn not_blank(text: &str) -> EvalError {
    EvalError::new(EvalErrorKind::NotBlank {
        text: text.to_owned(),
    })
}

pub fn bad_if_expression(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::BadIfExpression {
        message: message.into(),
    })
}

pub fn bad_argument(function: &'static str, message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::BadArgument {
        function,
        message: message.into(),
    })
}

pub fn empty_name() -> EvalError {
    EvalError::new(EvalErrorKind::EmptyVariableName)
}

pub fn argument_mutated(function: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::ArgumentMutated { function })
}

pub fn program_invalidated() -> EvalError {
    EvalError::new(EvalErrorKind::ProgramInvalidated)
}
