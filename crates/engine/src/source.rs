//! Stages that are not processes.
//!
//! A [`Source`] produces text without spawning anything and has no stderr. A
//! [`Transform`] consumes the full text of everything before it and returns new
//! text; the composer runs its producer to completion before calling it.

use std::fmt;

/// A text-producing stage.
pub enum Source {
    /// Text available immediately.
    Literal(String),
    /// Text computed when the pipeline reaches this stage, exactly once.
    Deferred(Box<dyn FnOnce() -> String + Send>),
}

impl Source {
    /// A source yielding `text`.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// A source yielding the return value of `compute`, evaluated at run time.
    pub fn deferred<F>(compute: F) -> Self
    where
        F: FnOnce() -> String + Send + 'static,
    {
        Self::Deferred(Box::new(compute))
    }

    /// Produces the text, running the computation if deferred.
    ///
    /// A panicking computation is not caught.
    pub fn evaluate(self) -> String {
        match self {
            Self::Literal(text) => text,
            Self::Deferred(compute) => compute(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A computation consuming the trimmed output of its producer.
pub struct Transform(Box<dyn FnOnce(String) -> String + Send>);

impl Transform {
    /// Wraps `f` as a pipeline consumer.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(String) -> String + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Calls the computation with `input`.
    pub fn apply(self, input: String) -> String {
        (self.0)(input)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}
