//! `outputs.file`: writes metrics to stdout and/or files.
//!
//! Files are appended to. With `rotation_interval` or `rotation_max_size`
//! set, the current file is renamed to `<path>.<unix-seconds>` once either
//! limit is reached and a fresh file is opened in its place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use vane_core::prelude::*;
use vane_core::register_plugin;

use crate::serializer::DataFormat;

register_plugin!(FILE: output "file" => FileOutput);

/// Target name that selects standard output instead of a path.
pub const STDOUT: &str = "stdout";

struct RotatingFile {
    path: PathBuf,
    file: File,
    opened: DateTime<Utc>,
    written: u64,
}

impl RotatingFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            opened: Utc::now(),
            written,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let mut archived = self.path.clone().into_os_string();
        archived.push(format!(".{}", Utc::now().timestamp()));
        fs::rename(&self.path, &archived)?;
        info!(path = %self.path.display(), "Rotated output file");
        *self = Self::open(self.path.clone())?;
        Ok(())
    }
}

enum Sink {
    Stdout,
    File(RotatingFile),
}

#[derive(Default, Configurable)]
pub struct FileOutput {
    /// Paths to write to; `stdout` selects standard output.
    pub files: Vec<String>,
    /// Rotate files older than this. Zero disables time-based rotation.
    pub rotation_interval: Duration,
    /// Rotate files larger than this. Zero disables size-based rotation.
    pub rotation_max_size: Size,
    /// `influx` (default) or `json`.
    pub data_format: String,

    format: DataFormat,
    sinks: Vec<Sink>,
}

impl FileOutput {
    fn should_rotate(&self, file: &RotatingFile) -> bool {
        let max_size = self.rotation_max_size.as_u64();
        if max_size > 0 && file.written >= max_size {
            return true;
        }
        let interval = self.rotation_interval.as_std();
        !interval.is_zero()
            && Utc::now()
                .signed_duration_since(file.opened)
                .to_std()
                .is_ok_and(|age| age >= interval)
    }
}

impl Output for FileOutput {
    fn init(&mut self) -> PluginResult<()> {
        self.format = self.data_format.parse()?;
        if self.files.is_empty() {
            self.files.push(STDOUT.to_string());
        }
        Ok(())
    }

    fn connect(&mut self) -> PluginResult<()> {
        let mut sinks = Vec::with_capacity(self.files.len());
        for target in &self.files {
            if target == STDOUT {
                sinks.push(Sink::Stdout);
            } else {
                sinks.push(Sink::File(RotatingFile::open(PathBuf::from(target))?));
            }
        }
        debug!(targets = ?self.files, "File output connected");
        self.sinks = sinks;
        Ok(())
    }

    fn write(&mut self, metrics: &[Metric]) -> PluginResult<()> {
        if self.sinks.is_empty() {
            return Err(PluginError::custom("file output is not connected"));
        }
        let payload: String = metrics.iter().map(|m| self.format.serialize(m)).collect();

        let mut sinks = std::mem::take(&mut self.sinks);
        let result = sinks.iter_mut().try_for_each(|sink| match sink {
            Sink::Stdout => io::stdout().lock().write_all(payload.as_bytes()),
            Sink::File(file) => {
                if self.should_rotate(file) {
                    file.rotate()?;
                }
                file.file.write_all(payload.as_bytes())?;
                file.written += payload.len() as u64;
                Ok(())
            }
        });
        self.sinks = sinks;
        Ok(result?)
    }

    fn close(&mut self) -> PluginResult<()> {
        for sink in self.sinks.drain(..) {
            match sink {
                Sink::Stdout => io::stdout().flush()?,
                Sink::File(mut file) => file.file.flush()?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vane_core::{FieldKind, assign, describe};

    use super::*;

    fn output_for(raw: serde_json::Value) -> FileOutput {
        let mut output = FileOutput::default();
        assign(raw.as_object().unwrap(), &mut output).unwrap();
        output.init().unwrap();
        output.connect().unwrap();
        output
    }

    #[test]
    fn test_writes_line_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.out");
        let mut output = output_for(json!({"files": [path.to_str().unwrap()]}));

        output
            .write(&[Metric::new("mem").with_field("used", 5i64)])
            .unwrap();
        output.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("mem used=5i "), "{content}");
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_rotates_on_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.out");
        let mut output = output_for(json!({
            "files": [path.to_str().unwrap()],
            "rotation_max_size": "10B",
            "data_format": "json",
        }));

        let batch = [Metric::new("mem").with_field("used", 5i64)];
        output.write(&batch).unwrap();
        output.write(&batch).unwrap();
        output.close().unwrap();

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 2);
        let current = fs::read_to_string(&path).unwrap();
        assert_eq!(current.lines().count(), 1);
    }

    #[test]
    fn test_defaults_to_stdout() {
        let mut output = FileOutput::default();
        output.init().unwrap();
        assert_eq!(output.files, [STDOUT]);
    }

    #[test]
    fn test_unknown_format_fails_init() {
        let mut output = FileOutput {
            data_format: "carbon".into(),
            ..Default::default()
        };
        assert!(output.init().is_err());
    }

    #[test]
    fn test_write_before_connect_fails() {
        let mut output = FileOutput::default();
        output.init().unwrap();
        assert!(output.write(&[]).is_err());
    }

    #[test]
    fn test_schema() {
        let schema = describe(&FileOutput::default());
        assert_eq!(schema["rotation_interval"].kind, FieldKind::Duration);
        assert_eq!(schema["rotation_max_size"].kind, FieldKind::Size);
        assert_eq!(schema["files"].element_kind, Some(FieldKind::String));
        assert!(!schema.contains_key("sinks"));
    }
}
