use crate::db::event::{EntityChangeEvent, EventSink, PublishOutcome};
use parking_lot::Mutex;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

///
/// FileSink
///
/// Append-only JSON-lines sink: the `file` config choice. One event per
/// line; a single writer handle keeps appends ordered.
///

pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn publish(&self, event: &EntityChangeEvent) -> PublishOutcome {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                log::error!("file sink cannot encode event for {}: {err}", event.external_id);
                return PublishOutcome::Fatal;
            }
        };

        let mut file = self.file.lock();
        match writeln!(file, "{line}").and_then(|()| file.flush()) {
            Ok(()) => PublishOutcome::Ack,
            Err(err) => {
                log::warn!("file sink append failed at {}: {err}", self.path.display());
                PublishOutcome::Retryable
            }
        }
    }
}

///
/// TESTS
///
