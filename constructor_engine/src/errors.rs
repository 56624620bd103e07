use std::fmt;
use thiserror::Error;

/// Result alias used across the engine.
pub type EngineResult<T> = Result<T, BuildError>;

/// Separator used when joining construction-error path segments.
pub const PATH_SEPARATOR: &str = " -> ";

/// Errors escaping a `build` call.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A parameter could not be resolved; carries the path-annotated chain.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The descriptor provider does not know the requested type.
    #[error("type '{type_name}' has no registered descriptors")]
    UnknownType { type_name: String },

    /// A nested object was requested from a payload that is not a mapping.
    #[error("payload for type '{type_name}' must be a mapping, got {found}")]
    PayloadNotMapping {
        type_name: String,
        found: &'static str,
    },

    /// Recursion went deeper than the configured limit.
    #[error("building type '{type_name}' exceeded the maximum resolution depth of {limit}")]
    DepthExceeded { type_name: String, limit: usize },

    /// The builder strategy refused the final argument list.
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

impl BuildError {
    pub fn as_construction(&self) -> Option<&ConstructionError> {
        match self {
            BuildError::Construction(err) => Some(err),
            _ => None,
        }
    }
}

/// Why a single alternative trial failed. Collected, never raised on its own.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// A list alternative was tried against a value that is not a sequence.
    #[error("type {type_name}[] expects a sequence, got {found}")]
    SequenceExpected {
        type_name: String,
        found: &'static str,
    },

    /// Any other failure raised while trying a non-primitive alternative.
    #[error("alternative '{type_name}' failed: {source}")]
    AlternativeFailed {
        type_name: String,
        #[source]
        source: Box<BuildError>,
    },
}

impl AttemptError {
    pub fn type_name(&self) -> &str {
        match self {
            AttemptError::SequenceExpected { type_name, .. } => type_name,
            AttemptError::AlternativeFailed { type_name, .. } => type_name,
        }
    }
}

/// Errors raised by builder strategies and instance factories.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("no factory registered for type '{type_name}'")]
    Unregistered { type_name: String },

    #[error("type '{type_name}' requires argument '{parameter}'")]
    MissingArgument {
        type_name: String,
        parameter: String,
    },

    #[error("invalid argument '{parameter}' for type '{type_name}': {reason}")]
    InvalidArgument {
        type_name: String,
        parameter: String,
        reason: String,
    },

    #[error("argument '{parameter}' of type '{type_name}' cannot be emitted: {reason}")]
    Unrepresentable {
        type_name: String,
        parameter: String,
        reason: String,
    },

    #[error("{0}")]
    Custom(String),
}

/* What a construction-error link carries: leaf attempts or one deeper link */
#[derive(Debug)]
enum Cause {
    Attempts(Vec<AttemptError>),
    Nested(Box<ConstructionError>),
}

/// One failed parameter resolution, linked to the failure that caused it.
///
/// The outermost link names the parameter of the type that was requested;
/// each chained link names the parameter one nesting level deeper. Only the
/// innermost link holds attempt errors.
#[derive(Debug)]
pub struct ConstructionError {
    segment: String,
    cause: Cause,
}

impl ConstructionError {
    /// Every alternative of `segment` failed.
    ///
    /// # Panics
    ///
    /// Panics when `errors` is empty. An exhausted parameter always has at
    /// least one failed attempt, so an empty list is a programming error.
    pub fn exhausted(segment: impl Into<String>, errors: Vec<AttemptError>) -> Self {
        let segment = segment.into();
        assert!(
            !errors.is_empty(),
            "construction error for '{segment}' must carry at least one attempt error or wrap a nested construction error"
        );
        Self {
            segment,
            cause: Cause::Attempts(errors),
        }
    }

    /// `segment` failed because a nested construction failed.
    pub fn chained(segment: impl Into<String>, inner: ConstructionError) -> Self {
        Self {
            segment: segment.into(),
            cause: Cause::Nested(Box::new(inner)),
        }
    }

    /// This link's parameter name.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The next deeper link, if any.
    pub fn previous(&self) -> Option<&ConstructionError> {
        match &self.cause {
            Cause::Nested(inner) => Some(inner),
            Cause::Attempts(_) => None,
        }
    }

    fn links(&self) -> impl Iterator<Item = &ConstructionError> {
        std::iter::successors(Some(self), |link| link.previous())
    }

    /// Segments from outermost to innermost, e.g. `center -> x`.
    pub fn path(&self) -> String {
        self.links()
            .map(ConstructionError::segment)
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// The innermost link's attempt errors (the leaf reasons).
    pub fn errors(&self) -> &[AttemptError] {
        let mut link = self;
        loop {
            match &link.cause {
                Cause::Attempts(errors) => return errors,
                Cause::Nested(inner) => link = inner,
            }
        }
    }

    pub fn innermost(&self) -> &ConstructionError {
        self.links().last().unwrap_or(self)
    }

    /// Number of links in the chain.
    pub fn depth(&self) -> usize {
        self.links().count()
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve parameter '{}'", self.path())?;
        for (idx, error) in self.errors().iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConstructionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Nested(inner) => Some(inner.as_ref()),
            Cause::Attempts(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence_expected(type_name: &str) -> AttemptError {
        AttemptError::SequenceExpected {
            type_name: type_name.to_string(),
            found: "string",
        }
    }

    #[test]
    fn path_joins_segments_outermost_first() {
        let inner = ConstructionError::exhausted("x", vec![sequence_expected("Coord")]);
        let middle = ConstructionError::chained("center", inner);
        let outer = ConstructionError::chained("shape", middle);

        assert_eq!(outer.path(), "shape -> center -> x");
        assert_eq!(outer.depth(), 3);
        assert_eq!(outer.innermost().segment(), "x");
    }

    #[test]
    fn errors_come_from_the_innermost_link() {
        let inner = ConstructionError::exhausted(
            "x",
            vec![sequence_expected("A"), sequence_expected("B")],
        );
        let outer = ConstructionError::chained("center", inner);

        let types: Vec<&str> = outer.errors().iter().map(AttemptError::type_name).collect();
        assert_eq!(types, vec!["A", "B"]);
    }

    #[test]
    fn display_lists_leaf_reasons() {
        let err = ConstructionError::chained(
            "members",
            ConstructionError::exhausted("x", vec![sequence_expected("Point")]),
        );
        assert_eq!(
            err.to_string(),
            "cannot resolve parameter 'members -> x': type Point[] expects a sequence, got string"
        );
    }

    #[test]
    fn source_walks_the_chain() {
        let err = ConstructionError::chained(
            "center",
            ConstructionError::exhausted("x", vec![sequence_expected("Point")]),
        );
        let source = std::error::Error::source(&err).expect("chained source");
        assert!(source.to_string().contains("'x'"));
    }

    #[test]
    #[should_panic(expected = "must carry at least one attempt error")]
    fn empty_attempt_list_is_a_programming_error() {
        let _ = ConstructionError::exhausted("x", Vec::new());
    }
}
