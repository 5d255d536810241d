//! Pipeline composition.
//!
//! A [`Stage`] is one link of a pipeline: a command, a source, a transform, or
//! an already-composed [`Pipeline`]. Composition flattens, so a chain of N
//! `pipe` calls is one pipeline of N ordered [`Member`]s, never a tree.

use command::CommandSpec;

use crate::source::{Source, Transform};

/// One link in a pipeline. Consumed exactly once by a run.
#[derive(Debug)]
pub enum Stage {
    /// A command to resolve and launch.
    Process(CommandSpec),
    /// A literal or deferred text source.
    Source(Source),
    /// A computation over the full output of everything before it.
    Transform(Transform),
    /// Two or more stages chained stdout to stdin.
    Pipeline(Pipeline),
}

impl Stage {
    /// A command stage for a single program token. `None` if `program` is empty.
    pub fn cmd(program: impl Into<String>) -> Option<Self> {
        CommandSpec::path(program).map(Self::Process)
    }

    /// A command stage for an argv vector. `None` if the vector or its first
    /// element is empty.
    pub fn argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::argv(argv).map(Self::Process)
    }

    /// A source stage yielding `text`.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Source(Source::literal(text))
    }

    /// A source stage yielding the result of `compute`, evaluated once at run time.
    pub fn deferred<F>(compute: F) -> Self
    where
        F: FnOnce() -> String + Send + 'static,
    {
        Self::Source(Source::deferred(compute))
    }

    /// A transform stage applying `f` to its producer's trimmed output.
    pub fn transform<F>(f: F) -> Self
    where
        F: FnOnce(String) -> String + Send + 'static,
    {
        Self::Transform(Transform::new(f))
    }

    /// Connects this stage's output to `next`'s input.
    pub fn pipe(self, next: impl Into<Stage>) -> Self {
        Self::Pipeline(compose(self, next.into()))
    }

    /// Number of member stages once flattened.
    pub fn len(&self) -> usize {
        match self {
            Self::Pipeline(pipeline) => pipeline.len(),
            _ => 1,
        }
    }

    /// Always `false`; a stage has at least one member.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The flattened members in pipeline order.
    pub fn into_members(self) -> Vec<Member> {
        match self {
            Self::Process(spec) => vec![Member::Process(spec)],
            Self::Source(source) => vec![Member::Source(source)],
            Self::Transform(transform) => vec![Member::Transform(transform)],
            Self::Pipeline(pipeline) => pipeline.members,
        }
    }
}

impl From<CommandSpec> for Stage {
    fn from(spec: CommandSpec) -> Self {
        Self::Process(spec)
    }
}

impl From<Source> for Stage {
    fn from(source: Source) -> Self {
        Self::Source(source)
    }
}

impl From<Transform> for Stage {
    fn from(transform: Transform) -> Self {
        Self::Transform(transform)
    }
}

impl From<Pipeline> for Stage {
    fn from(pipeline: Pipeline) -> Self {
        Self::Pipeline(pipeline)
    }
}

// ---------------------------------------------------------------------------

/// One element of a flattened pipeline. Unlike [`Stage`] it cannot itself be
/// a pipeline.
#[derive(Debug)]
pub enum Member {
    /// A command to resolve and launch.
    Process(CommandSpec),
    /// A literal or deferred text source.
    Source(Source),
    /// A computation over the full output of everything before it.
    Transform(Transform),
}

/// An ordered chain of at least two members.
#[derive(Debug)]
pub struct Pipeline {
    members: Vec<Member>,
}

impl Pipeline {
    /// Number of member stages.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if there are no members. A pipeline built by
    /// [`compose`] always has at least two.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members in pipeline order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }
}

/// Chains `producer` into `consumer`, appending rather than nesting.
pub fn compose(producer: Stage, consumer: Stage) -> Pipeline {
    let mut members = producer.into_members();
    members.extend(consumer.into_members());
    Pipeline { members }
}
