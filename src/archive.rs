//! Streaming tar→zip rewrite
//!
//! Hosts serve module source as a gzipped tar whose entries live
//! under one opaque top-level directory. Clients expect a zip whose
//! entries live under `<module>@<version>/`. This module converts
//! between the two on the fly: response bytes flow through a gzip
//! decoder and tar reader into a zip writer feeding an in-memory
//! pipe, and the read end is handed to the caller as soon as the
//! upstream directory prefix is known. Nothing buffers more than a
//! pipe window of the archive.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_compression::tokio::bufread::GzipDecoder;
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::oneshot;
use tokio_tar::{Archive, Entry};
use tokio_util::compat::FuturesAsyncWriteCompatExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::config::ZIP_PIPE_BUF;
use crate::error::ProtocolError;

/// Byte stream of a rewritten zip archive
pub type ZipReader = Box<dyn AsyncRead + Send + Unpin>;

/// Fetches a gzipped tar archive and returns it as a zip stream with
/// every entry path rewritten under `prefix`.
///
/// Returns once the upstream directory prefix is determined; errors
/// after that point surface as read errors on the returned stream.
/// Dropping the stream aborts the transfer and releases the upstream
/// connection.
pub async fn rewrite_tar_to_zip(
    client: &reqwest::Client,
    tar_url: &str,
    prefix: &str,
) -> Result<ZipReader, ProtocolError> {
    let response = client.get(tar_url).send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProtocolError::NotFound);
    }
    if !status.is_success() {
        return Err(ProtocolError::Upstream(format!(
            "unexpected status {status} from {tar_url}"
        )));
    }

    let bytes = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other)),
    );
    let tar = Archive::new(GzipDecoder::new(StreamReader::new(bytes)));

    let (read_half, write_half) = tokio::io::duplex(ZIP_PIPE_BUF);
    let fail = Arc::new(Mutex::new(None));
    let (ready_tx, ready_rx) = oneshot::channel();
    tokio::spawn(pump(
        tar,
        prefix.to_string(),
        write_half,
        Arc::clone(&fail),
        ready_tx,
    ));

    match ready_rx.await {
        Ok(Ok(())) => Ok(Box::new(ZipStream {
            inner: read_half,
            fail,
        })),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(ProtocolError::StreamAborted(
            "archive worker exited before the directory prefix was determined".to_string(),
        )),
    }
}

/// Read end of the rewrite pipe.
///
/// A worker failure after streaming began is stored out of band and
/// surfaced here in place of a clean end of stream.
struct ZipStream {
    inner: DuplexStream,
    fail: Arc<Mutex<Option<io::Error>>>,
}

impl AsyncRead for ZipStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let filled = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == filled => {
                // End of stream: the worker has gone; report its
                // failure if it recorded one.
                match self.fail.lock().expect("fail slot poisoned").take() {
                    Some(err) => Poll::Ready(Err(err)),
                    None => Poll::Ready(Ok(())),
                }
            }
            other => other,
        }
    }
}

/// Worker half of the rewrite: walks tar entries and feeds the zip
/// writer. `ready` fires after the first accepted entry fixes the
/// directory prefix to rewrite.
async fn pump<R>(
    mut archive: Archive<R>,
    prefix: String,
    out: DuplexStream,
    fail: Arc<Mutex<Option<io::Error>>>,
    ready: oneshot::Sender<Result<(), ProtocolError>>,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut entries = match archive.entries() {
        Ok(entries) => entries,
        Err(e) => {
            let _ = ready.send(Err(ProtocolError::Upstream(format!("reading archive: {e}"))));
            return;
        }
    };

    // The first entry that is a regular file or directory decides the
    // upstream prefix. Some hosts emit a leading directory entry,
    // others start straight with a file; both shapes end up here.
    let mut first_file = None;
    let dir = loop {
        match entries.next().await {
            Some(Ok(entry)) => {
                let kind = entry.header().entry_type();
                if kind.is_dir() {
                    break entry_name(&entry);
                }
                if kind.is_file() {
                    let name = entry_name(&entry);
                    let dir = match name.rsplit_once('/') {
                        Some((parent, _)) => format!("{parent}/"),
                        None => String::new(),
                    };
                    first_file = Some(entry);
                    break dir;
                }
            }
            Some(Err(e)) => {
                let _ = ready.send(Err(ProtocolError::Upstream(format!("reading archive: {e}"))));
                return;
            }
            None => {
                let _ = ready.send(Err(ProtocolError::Upstream("empty archive".to_string())));
                return;
            }
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    let mut zip = ZipFileWriter::with_tokio(out);
    let copied = async {
        if let Some(entry) = first_file.take() {
            write_entry(&mut zip, entry, &dir, &prefix).await?;
        }
        while let Some(next) = entries.next().await {
            let entry =
                next.map_err(|e| ProtocolError::StreamAborted(format!("reading archive: {e}")))?;
            write_entry(&mut zip, entry, &dir, &prefix).await?;
        }
        Ok::<_, ProtocolError>(())
    }
    .await;

    if let Err(err) = copied {
        debug!("tar to zip rewrite aborted: {err}");
        *fail.lock().expect("fail slot poisoned") = Some(io::Error::other(err));
    }
    // Closed exactly once on both paths so the reader observes either
    // a complete archive or the recorded failure.
    let _ = zip.close().await;
}

/// Writes one tar entry into the zip, rewriting the directory prefix.
/// Entries that are neither regular files nor directories are skipped.
async fn write_entry<R, W>(
    zip: &mut ZipFileWriter<W>,
    mut entry: Entry<Archive<R>>,
    dir: &str,
    prefix: &str,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let kind = entry.header().entry_type();
    if !kind.is_file() && !kind.is_dir() {
        return Ok(());
    }

    let name = entry_name(&entry);
    let path = name.replacen(dir, prefix, 1);

    if kind.is_dir() {
        let builder = ZipEntryBuilder::new(path.into(), Compression::Stored);
        zip.write_entry_whole(builder, &[])
            .await
            .map_err(|e| ProtocolError::StreamAborted(format!("writing zip entry: {e}")))?;
        return Ok(());
    }

    let builder = ZipEntryBuilder::new(path.into(), Compression::Deflate);
    let writer = zip
        .write_entry_stream(builder)
        .await
        .map_err(|e| ProtocolError::StreamAborted(format!("writing zip entry: {e}")))?;
    let mut writer = writer.compat_write();
    tokio::io::copy(&mut entry, &mut writer)
        .await
        .map_err(|e| ProtocolError::StreamAborted(format!("copying {name}: {e}")))?;
    writer
        .into_inner()
        .close()
        .await
        .map_err(|e| ProtocolError::StreamAborted(format!("finishing zip entry: {e}")))?;

    Ok(())
}

fn entry_name<R: AsyncRead + Unpin>(entry: &Entry<Archive<R>>) -> String {
    String::from_utf8_lossy(&entry.path_bytes()).into_owned()
}
