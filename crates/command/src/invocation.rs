//! Command specifications and the outcome of resolving them.
//!
//! A [`CommandSpec`] is what the caller hands over: a single program token or
//! an argv vector. The resolver turns it into a [`ResolvedInvocation`] whose
//! [`Validity`] says whether it may be launched at all. Pre-launch failures are
//! data, never errors: the launcher reads the validity and synthesises a
//! result instead of spawning.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ProgramName;

/// Name of the environment variable holding the search path.
pub const SEARCH_PATH_VAR: &str = "PATH";

// ---------------------------------------------------------------------------
// Command specification
// ---------------------------------------------------------------------------

/// A command as supplied by the caller, already tokenized.
///
/// Immutable once constructed; consumed once by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSpec {
    /// A lone program token with no arguments (`"ls"`, `"/bin/true"`).
    Path(ProgramName),
    /// An argv vector. `program` is `argv[0]`; `args` are the remaining elements.
    Argv {
        /// `argv[0]` as written by the caller.
        program: ProgramName,
        /// Arguments passed after the program, in order.
        args: Vec<String>,
    },
}

impl CommandSpec {
    /// Creates a [`CommandSpec::Path`], returning `None` if `program` is empty.
    pub fn path(program: impl Into<String>) -> Option<Self> {
        ProgramName::new(program).map(Self::Path)
    }

    /// Creates a [`CommandSpec::Argv`] from an ordered sequence of tokens.
    ///
    /// Returns `None` if the sequence is empty or its first element is empty.
    pub fn argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = argv.into_iter().map(Into::into);
        let program = ProgramName::new(tokens.next()?)?;
        Some(Self::Argv {
            program,
            args: tokens.collect(),
        })
    }

    /// The program token (`argv[0]`).
    pub fn program(&self) -> &ProgramName {
        match self {
            Self::Path(program) | Self::Argv { program, .. } => program,
        }
    }

    /// The arguments following the program; empty for [`CommandSpec::Path`].
    pub fn args(&self) -> &[String] {
        match self {
            Self::Path(_) => &[],
            Self::Argv { args, .. } => args,
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program())?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Search path
// ---------------------------------------------------------------------------

/// Ordered list of directories searched for bare program names.
///
/// Injected into the resolver rather than read implicitly, so resolution can be
/// exercised against a fixed list of directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPath(Vec<PathBuf>);

impl SearchPath {
    /// Creates a search path from explicit directories, searched in order.
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(dirs.into_iter().map(Into::into).collect())
    }

    /// Parses a list in the platform's `PATH` format (`:`-separated on Unix).
    /// An empty entry means the current directory; an empty value means no
    /// directories.
    pub fn parse(value: impl AsRef<OsStr>) -> Self {
        let value = value.as_ref();
        if value.is_empty() {
            return Self::default();
        }
        Self(
            std::env::split_paths(value)
                .map(|entry| {
                    if entry.as_os_str().is_empty() {
                        PathBuf::from(".")
                    } else {
                        entry
                    }
                })
                .collect(),
        )
    }

    /// Reads [`SEARCH_PATH_VAR`] from the process environment.
    ///
    /// Entries need not be valid UTF-8. An unset variable yields an empty
    /// search path; absolute program paths still resolve.
    pub fn from_env() -> Self {
        std::env::var_os(SEARCH_PATH_VAR)
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Candidate locations for `name`, one per directory, in search order.
    pub fn candidates<'a>(&'a self, name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.0.iter().map(move |dir| dir.join(name))
    }

    /// The directories, in search order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.0
    }

    /// Returns `true` if no directories are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolution outcome
// ---------------------------------------------------------------------------

/// Whether a resolved invocation may be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// The path exists, is a regular file, and is executable by the current user.
    Runnable,
    /// No file exists at the path (or on any search-path directory).
    NotFound,
    /// The path names a directory.
    IsDirectory,
    /// The path exists but the current user may not execute it.
    NotExecutable,
}

impl Validity {
    /// Returns `true` only for [`Validity::Runnable`].
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Runnable)
    }

    /// The fixed message reported in place of a process run, or `None` when
    /// the invocation is runnable.
    pub fn failure_message(self, path: &Path) -> Option<String> {
        let reason = match self {
            Self::Runnable => return None,
            Self::NotFound => "launch path not accessible",
            Self::IsDirectory => "launch path is a directory",
            Self::NotExecutable => "launch path not executable",
        };
        Some(format!("{}: {reason}", path.display()))
    }
}

/// A command spec after resolution: the concrete path to execute, the argument
/// vector, and whether it may be launched.
///
/// An invocation whose validity is anything but [`Validity::Runnable`] must
/// never be spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInvocation {
    /// Path to execute. For [`Validity::NotFound`] on a bare name this is the
    /// name itself, since no candidate exists.
    pub path: PathBuf,

    /// The original program token, passed to the child as `argv[0]`.
    pub program: ProgramName,

    /// Arguments following `argv[0]`.
    pub args: Vec<String>,

    /// Whether the invocation may be launched.
    pub validity: Validity,
}

impl ResolvedInvocation {
    /// Returns `true` if the invocation may be launched.
    pub fn is_runnable(&self) -> bool {
        self.validity.is_runnable()
    }

    /// The synthetic error text for a non-runnable invocation.
    pub fn failure_message(&self) -> Option<String> {
        self.validity.failure_message(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_splits_program_and_args() {
        let spec = CommandSpec::argv(["ls", "-l", "README.md"]).unwrap();
        assert_eq!(spec.program().as_str(), "ls");
        assert_eq!(spec.args(), ["-l".to_string(), "README.md".to_string()]);
        assert_eq!(spec.to_string(), "ls -l README.md");
    }

    #[test]
    fn argv_rejects_empty_vector_and_empty_program() {
        assert!(CommandSpec::argv(Vec::<String>::new()).is_none());
        assert!(CommandSpec::argv(["", "x"]).is_none());
        assert!(CommandSpec::path("").is_none());
    }

    #[test]
    fn path_spec_has_no_args() {
        let spec = CommandSpec::path("true").unwrap();
        assert!(spec.args().is_empty());
    }

    #[test]
    fn search_path_parse_keeps_order_and_maps_empty_to_cwd() {
        let path = SearchPath::parse("/usr/bin::/bin");
        assert_eq!(
            path.dirs(),
            [
                PathBuf::from("/usr/bin"),
                PathBuf::from("."),
                PathBuf::from("/bin")
            ]
        );
        assert!(SearchPath::parse("").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn search_path_parse_keeps_non_utf8_entries() {
        use std::ffi::OsString;
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let value = OsString::from_vec(b"/opt/caf\xe9/bin:/bin".to_vec());
        let path = SearchPath::parse(&value);
        assert_eq!(path.dirs().len(), 2);
        assert_eq!(path.dirs()[0].as_os_str().as_bytes(), b"/opt/caf\xe9/bin");
        assert_eq!(path.dirs()[1], PathBuf::from("/bin"));
    }

    #[test]
    fn search_path_candidates_join_name() {
        let path = SearchPath::new(["/a", "/b"]);
        let found: Vec<_> = path.candidates("cat").collect();
        assert_eq!(found, [PathBuf::from("/a/cat"), PathBuf::from("/b/cat")]);
    }

    #[test]
    fn failure_messages_match_validity() {
        let p = Path::new("/bin/yolo");
        assert_eq!(Validity::Runnable.failure_message(p), None);
        assert_eq!(
            Validity::NotFound.failure_message(p).unwrap(),
            "/bin/yolo: launch path not accessible"
        );
        assert_eq!(
            Validity::IsDirectory.failure_message(Path::new("/")).unwrap(),
            "/: launch path is a directory"
        );
        assert_eq!(
            Validity::NotExecutable
                .failure_message(Path::new("/etc/passwd"))
                .unwrap(),
            "/etc/passwd: launch path not executable"
        );
    }
}
