//! Byte streams flowing between stages.
//!
//! A [`Feed`] is anything a stage can read its input from: a child's stdout
//! pipe or an in-memory buffer holding a source's text. Both implement the same
//! read interface, so the composer wires them identically.

use std::io::{self, Cursor};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::process::ChildStdin;
use tokio::task::JoinHandle;

use command::ChoreError;

/// Readable end of a stage's output.
pub type Feed = Box<dyn AsyncRead + Send + Unpin>;

/// A feed that yields `text` and then end-of-file.
pub fn text_feed(text: impl Into<String>) -> Feed {
    Box::new(Cursor::new(text.into().into_bytes()))
}

/// A feed that is immediately at end-of-file.
pub fn empty_feed() -> Feed {
    Box::new(tokio::io::empty())
}

/// Reads `from` to end-of-file.
pub async fn drain<R>(mut from: R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    from.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Copies `from` into a child's stdin until either side closes, then closes
/// the stdin pipe so the child sees end-of-file.
///
/// A consumer that exits before reading everything is not an error: the copy
/// stops and dropping `from` closes the producer's pipe in turn.
pub async fn relay(mut from: Feed, mut to: ChildStdin) -> io::Result<u64> {
    let copied = copy_ignoring_broken_pipe(&mut from, &mut to).await;
    drop(to);
    copied
}

/// Reads and discards `from` so its producer never blocks on a full pipe.
pub async fn discard(mut from: Feed) -> io::Result<u64> {
    copy_ignoring_broken_pipe(&mut from, &mut tokio::io::sink()).await
}

async fn copy_ignoring_broken_pipe<R, W>(from: &mut R, to: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    match tokio::io::copy(from, to).await {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(0),
        other => other,
    }
}

/// Awaits a background stream task, mapping panics and I/O failures onto
/// [`ChoreError`].
pub(crate) async fn join<T>(
    task: JoinHandle<io::Result<T>>,
    context: impl Into<String>,
) -> Result<T, ChoreError> {
    let context = context.into();
    task.await
        .map_err(|e| ChoreError::Task {
            message: format!("{context}: {e}"),
        })?
        .map_err(|e| ChoreError::io(context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_feed_yields_exact_bytes() {
        let bytes = drain(text_feed("yolo\n")).await.unwrap();
        assert_eq!(bytes, b"yolo\n");
    }

    #[tokio::test]
    async fn empty_feed_is_at_eof() {
        assert!(drain(empty_feed()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn discard_consumes_everything() {
        let n = discard(text_feed("x".repeat(100_000))).await.unwrap();
        assert_eq!(n, 100_000);
    }

    #[tokio::test]
    async fn join_maps_io_error_with_context() {
        let task = tokio::spawn(async {
            Err::<(), _>(io::Error::new(io::ErrorKind::Other, "boom"))
        });
        let err = join(task, "reading stdout").await.unwrap_err();
        assert!(matches!(err, ChoreError::Io { .. }));
        assert!(err.to_string().contains("reading stdout"));
    }
}
