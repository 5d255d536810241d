//! Command resolution.
//!
//! Turns a [`CommandSpec`] into a [`ResolvedInvocation`] without spawning
//! anything. A bad command never produces an error here; its [`Validity`] says
//! why it cannot run and the launcher reports that as a result.

use std::path::{Path, PathBuf};

use command::{CommandSpec, ResolvedInvocation, SearchPath, Validity};
use tracing::debug;

/// Resolves program tokens against an injected [`SearchPath`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    search_path: SearchPath,
}

impl Resolver {
    /// Creates a resolver that looks bare names up in `search_path`.
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    /// The directories searched for bare names.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Resolves `spec` into an invocation plan.
    ///
    /// An absolute program token is checked as given. Any other token is looked
    /// up in each search-path directory in order; the first existing entry is
    /// the candidate, whether or not it turns out to be runnable.
    pub fn resolve(&self, spec: &CommandSpec) -> ResolvedInvocation {
        let program = spec.program();

        let candidate = if program.is_absolute() {
            let path = PathBuf::from(program.as_str());
            path.exists().then_some(path)
        } else {
            self.search_path
                .candidates(program.as_str())
                .find(|path| path.exists())
        };

        let (path, validity) = match candidate {
            Some(path) => {
                let validity = classify(&path);
                (path, validity)
            }
            None => (PathBuf::from(program.as_str()), Validity::NotFound),
        };

        debug!(
            program = %program,
            path = %path.display(),
            ?validity,
            "Resolved command"
        );

        ResolvedInvocation {
            path,
            program: program.clone(),
            args: spec.args().to_vec(),
            validity,
        }
    }
}

/// Classifies an existing path.
fn classify(path: &Path) -> Validity {
    let Ok(metadata) = path.metadata() else {
        // Vanished or a dangling symlink since the existence check.
        return Validity::NotFound;
    };
    if metadata.is_dir() {
        Validity::IsDirectory
    } else if metadata.is_file() && is_executable(path) {
        Validity::Runnable
    } else {
        Validity::NotExecutable
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
