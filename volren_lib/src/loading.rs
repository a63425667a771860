//! Fetching volume files with progress reporting.
//!
//! Volumes are read from a file, from memory, or over HTTP with the `http` feature.
//! Loading can run on a background thread, progress and the result are sent
//! back over a channel.

use std::{
    io::Read,
    path::PathBuf,
    thread::JoinHandle,
};

use crossbeam::channel::{Receiver, Sender};

use crate::{
    error::{Error, Result},
    volumetric::{self, ScalarVolume},
};

const CHUNK_SIZE: usize = 64 * 1024;

/// Announced sizes are not trusted past this, the buffer grows as data arrives
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Bytes received so far, `total` is known only if the source announces it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Percentage, `None` if the total size is unknown
    pub fn percent(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(100.0 * self.loaded as f32 / total as f32),
            None => None,
        }
    }
}

/// Reads whole `reader`, reporting progress after every chunk.
///
/// If `total` is known, a shorter transfer is an error and the partial data is dropped.
pub fn read_with_progress<R, F>(mut reader: R, total: Option<u64>, mut on_progress: F) -> Result<Vec<u8>>
where
    R: Read,
    F: FnMut(ProgressEvent),
{
    let capacity = total.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
    let mut data = Vec::with_capacity(capacity);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    on_progress(ProgressEvent { loaded: 0, total });

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        data.extend_from_slice(&chunk[..n]);
        on_progress(ProgressEvent {
            loaded: data.len() as u64,
            total,
        });
    }

    if let Some(total) = total {
        if (data.len() as u64) < total {
            return Err(Error::Fetch(format!(
                "transfer ended after {} of {total} bytes",
                data.len()
            )));
        }
    }
    Ok(data)
}

/// Where volume bytes come from
#[derive(Debug, Clone)]
pub enum VolumeSource {
    /// File read in chunks, with progress
    File(PathBuf),
    /// File mapped into memory, single progress event
    Mapped(PathBuf),
    Bytes(Vec<u8>),
    #[cfg(feature = "http")]
    Url(String),
}

impl VolumeSource {
    /// Fetch and parse, selecting scalar array `array` (first array if `None`)
    pub fn load<F>(self, array: Option<&str>, mut on_progress: F) -> Result<ScalarVolume>
    where
        F: FnMut(ProgressEvent),
    {
        let bytes = match self {
            VolumeSource::File(path) => {
                let file = std::fs::File::open(&path)
                    .map_err(|e| Error::Fetch(format!("{}: {e}", path.display())))?;
                let total = file.metadata()?.len();
                tracing::info!("Reading {} ({total} bytes)", path.display());
                read_with_progress(file, Some(total), on_progress)?
            }
            VolumeSource::Mapped(path) => {
                let volume = volumetric::from_file(&path, array)?;
                let len = std::fs::metadata(&path)?.len();
                on_progress(ProgressEvent {
                    loaded: len,
                    total: Some(len),
                });
                return Ok(volume);
            }
            VolumeSource::Bytes(bytes) => {
                let len = bytes.len() as u64;
                on_progress(ProgressEvent {
                    loaded: len,
                    total: Some(len),
                });
                bytes
            }
            #[cfg(feature = "http")]
            VolumeSource::Url(url) => fetch_url(&url, on_progress)?,
        };

        volumetric::from_bytes(bytes, array)
    }
}

#[cfg(feature = "http")]
fn fetch_url<F>(url: &str, on_progress: F) -> Result<Vec<u8>>
where
    F: FnMut(ProgressEvent),
{
    tracing::info!("Fetching {url}");
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Fetch(e.to_string()))?;
    let total = response.content_length();
    read_with_progress(response, total, on_progress)
}

/// Messages from loader thread
#[derive(Debug)]
pub enum LoadMessage {
    Progress(ProgressEvent),
    Done(Result<ScalarVolume>),
}

/// Loads a volume on its own thread
pub struct VolumeLoader;

impl VolumeLoader {
    pub fn spawn(source: VolumeSource, array: Option<String>) -> Result<LoadHandle> {
        let (sender, receiver) = crossbeam::channel::unbounded();

        let handle = std::thread::Builder::new()
            .name("Loader".into())
            .spawn(move || Self::run(source, array, sender))
            .map_err(|_| Error::InvalidState("cannot spawn loader thread"))?;

        Ok(LoadHandle {
            receiver,
            handle: Some(handle),
        })
    }

    fn run(source: VolumeSource, array: Option<String>, sender: Sender<LoadMessage>) {
        let progress = sender.clone();
        let res = source.load(array.as_deref(), |event| {
            // Receiver may be gone, loading still finishes
            let _ = progress.send(LoadMessage::Progress(event));
        });
        if let Err(e) = &res {
            tracing::warn!("Loading failed: {e}");
        }
        let _ = sender.send(LoadMessage::Done(res));
    }
}

/// Receiving end of a running load
pub struct LoadHandle {
    receiver: Receiver<LoadMessage>,
    handle: Option<JoinHandle<()>>,
}

impl LoadHandle {
    pub fn receiver(&self) -> &Receiver<LoadMessage> {
        &self.receiver
    }

    /// Block until the volume is loaded, passing progress events to `on_progress`
    pub fn wait_with_progress<F>(mut self, mut on_progress: F) -> Result<ScalarVolume>
    where
        F: FnMut(ProgressEvent),
    {
        let res = loop {
            match self.receiver.recv() {
                Ok(LoadMessage::Progress(event)) => on_progress(event),
                Ok(LoadMessage::Done(res)) => break res,
                Err(_) => break Err(Error::InvalidState("loader thread ended without result")),
            }
        };
        self.join();
        res
    }

    pub fn wait(self) -> Result<ScalarVolume> {
        self.wait_with_progress(|_| {})
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Loader thread panicked");
            }
        }
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::{test_helpers::*, volumetric::parse::svol_writer};

    #[test]
    fn percent() {
        let half = ProgressEvent {
            loaded: 50,
            total: Some(200),
        };
        compare_float(half.percent().unwrap(), 25.0);
        let unknown = ProgressEvent {
            loaded: 50,
            total: None,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn progress_is_monotonic() {
        let data = vec![7u8; 3 * CHUNK_SIZE + 10];
        let mut events = Vec::new();
        let read = read_with_progress(data.as_slice(), Some(data.len() as u64), |e| {
            events.push(e)
        })
        .unwrap();

        assert_eq!(read, data);
        assert_eq!(events.first().unwrap().loaded, 0);
        assert_eq!(events.last().unwrap().loaded, data.len() as u64);
        assert!(events.windows(2).all(|w| w[0].loaded <= w[1].loaded));
    }

    #[test]
    fn short_transfer() {
        let data = vec![1u8; 100];
        let res = read_with_progress(data.as_slice(), Some(200), |_| {});
        assert!(matches!(res, Err(Error::Fetch(_))));
    }

    #[test]
    fn absurd_announced_size() {
        let data = [1u8; 10];
        let res = read_with_progress(&data[..], Some(u64::MAX), |_| {});
        assert!(matches!(res, Err(Error::Fetch(_))));

        let res = read_with_progress(&data[..], Some(1 << 40), |_| {});
        assert!(matches!(res, Err(Error::Fetch(_))));
    }

    #[test]
    fn unknown_total() {
        let data = vec![1u8; 100];
        let mut last = None;
        let read = read_with_progress(data.as_slice(), None, |e| last = Some(e)).unwrap();
        assert_eq!(read.len(), 100);
        assert_eq!(
            last,
            Some(ProgressEvent {
                loaded: 100,
                total: None
            })
        );
    }

    #[test]
    fn background_load() {
        let bytes = svol_writer(&byte_grid((4, 3, 2)));
        let handle = VolumeLoader::spawn(VolumeSource::Bytes(bytes), None).unwrap();

        let mut events = 0;
        let volume = handle.wait_with_progress(|_| events += 1).unwrap();
        assert_eq!(events, 1);
        assert_eq!(volume.name(), "bytes");
        assert_eq!(volume.sample(3, 2, 1), 23.0);
    }

    #[test]
    fn background_load_error() {
        let handle =
            VolumeLoader::spawn(VolumeSource::Bytes(b"NOPE".to_vec()), None).unwrap();
        assert!(matches!(handle.wait(), Err(Error::DataFormat(_))));

        let missing = VolumeSource::File("/definitely/not/here.svol".into());
        assert!(matches!(missing.load(None, |_| {}), Err(Error::Fetch(_))));
    }
}
