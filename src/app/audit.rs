//! Append-only audit log with two channels: errors and sent mail.
//!
//! Each channel is resolved once from a destination string:
//! - `""` discards everything
//! - `"stdout"` / `"stderr"` write to the process streams
//! - anything else is a directory holding one append-mode file
//!
//! Writes after initialization are best effort. A failing sink is reported
//! through `tracing` and never reaches the request path.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::app::error::ConfigError;

/// File name stem used when no identity is supplied.
const DEFAULT_IDENTITY: &str = "localhost";
const ERROR_SUFFIX: &str = ".log";
const MAIL_SUFFIX: &str = "_mail.log";

/// Concrete destination behind one channel.
#[derive(Debug)]
enum Sink {
    Discard,
    Stdout,
    Stderr,
    File { path: PathBuf, file: Mutex<File> },
}

impl Sink {
    fn resolve(dest: &str, identity: &str, suffix: &str) -> Result<Self, ConfigError> {
        match dest {
            "" => Ok(Sink::Discard),
            "stdout" => Ok(Sink::Stdout),
            "stderr" => Ok(Sink::Stderr),
            dir => {
                let dir = PathBuf::from(dir);
                std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
                    dir: dir.clone(),
                    source,
                })?;

                let path = dir.join(format!("{}{}", identity, suffix));
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|source| ConfigError::OpenLog {
                        path: path.clone(),
                        source,
                    })?;

                Ok(Sink::File {
                    path,
                    file: Mutex::new(file),
                })
            }
        }
    }

    /// Write one complete record. Concurrent callers are serialized here.
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        match self {
            Sink::Discard => Ok(()),
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(record)?;
                out.flush()
            }
            Sink::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(record)?;
                out.flush()
            }
            Sink::File { file, .. } => {
                let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
                file.write_all(record)?;
                file.flush()
            }
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Sink::File { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Unresolved channel destinations, as configured.
#[derive(Debug, Clone, Default)]
pub struct AuditLogConfig {
    pub mail_dest: String,
    pub error_dest: String,
}

impl AuditLogConfig {
    pub fn new(mail_dest: impl Into<String>, error_dest: impl Into<String>) -> Self {
        Self {
            mail_dest: mail_dest.into(),
            error_dest: error_dest.into(),
        }
    }

    /// Open both channels. The first identity names the log files.
    /// With no destinations configured this still returns a discarding logger.
    pub fn init<S: AsRef<str>>(&self, identities: &[S]) -> Result<AuditLog, ConfigError> {
        let identity = identities
            .first()
            .map(|id| file_stem(id.as_ref()))
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string());

        Ok(AuditLog {
            errors: Arc::new(Sink::resolve(&self.error_dest, &identity, ERROR_SUFFIX)?),
            mail: Arc::new(Sink::resolve(&self.mail_dest, &identity, MAIL_SUFFIX)?),
        })
    }
}

/// Turn a host identity such as `https://example.com:8080` into a file stem.
fn file_stem(identity: &str) -> String {
    let trimmed = identity
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    let stem: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        DEFAULT_IDENTITY.to_string()
    } else {
        stem
    }
}

/// Handle to both audit channels. Cheap to clone; clones share the sinks.
#[derive(Debug, Clone)]
pub struct AuditLog {
    errors: Arc<Sink>,
    mail: Arc<Sink>,
}

impl AuditLog {
    /// A logger that drops everything.
    pub fn discard() -> Self {
        Self {
            errors: Arc::new(Sink::Discard),
            mail: Arc::new(Sink::Discard),
        }
    }

    /// Append one line to the error channel.
    ///
    /// The line is prefixed with an RFC 3339 timestamp. Embedded newlines are
    /// escaped so every event occupies exactly one line.
    pub fn write_error(&self, args: fmt::Arguments<'_>) {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let message = args.to_string().replace('\r', "\\r").replace('\n', "\\n");
        let line = format!("{} {}\n", timestamp, message);

        if let Err(err) = self.errors.write_record(line.as_bytes()) {
            tracing::warn!(%err, "failed to write error log record");
        }
    }

    /// Writer for one sent-mail record. The record is committed as a whole
    /// on `flush`, `close` or drop.
    pub fn mail_writer(&self) -> MailWriter<'_> {
        MailWriter {
            sink: self.mail.as_ref(),
            buf: Vec::new(),
        }
    }

    /// Path of the error log file, when the error channel is a directory.
    pub fn error_file(&self) -> Option<&Path> {
        self.errors.path()
    }

    /// Path of the sent-mail log file, when the mail channel is a directory.
    pub fn mail_file(&self) -> Option<&Path> {
        self.mail.path()
    }
}

/// Buffers one sent-mail record and hands it to the sink in a single write.
pub struct MailWriter<'a> {
    sink: &'a Sink,
    buf: Vec<u8>,
}

impl MailWriter<'_> {
    /// Commit the buffered record. The underlying file stays open.
    pub fn close(mut self) -> io::Result<()> {
        self.commit()
    }

    fn commit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let record = std::mem::take(&mut self.buf);
        self.sink.write_record(&record)
    }
}

impl Write for MailWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MailWriter<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            tracing::warn!(%err, "failed to write mail log record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &str = "The quick brown fox jumps over the lazy dog";

    #[test]
    fn empty_destinations_discard() {
        let log = AuditLogConfig::default().init::<&str>(&[]).unwrap();
        log.write_error(format_args!("hello {}", 4711));

        let mut writer = log.mail_writer();
        assert_eq!(writer.write(b"H3ll0").unwrap(), 5);
        writer.close().unwrap();

        assert!(log.error_file().is_none());
        assert!(log.mail_file().is_none());
    }

    #[test]
    fn error_channel_appends_single_lines() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("errors");
        let log = AuditLogConfig::new("", dest.to_str().unwrap())
            .init::<&str>(&[])
            .unwrap();

        log.write_error(format_args!("{}", TEST_DATA));
        log.write_error(format_args!("multi\nline"));

        let path = log.error_file().unwrap();
        assert_eq!(path, dest.join("localhost.log"));

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(TEST_DATA));
        assert!(lines[1].ends_with("multi\\nline"));
    }

    #[test]
    fn mail_channel_file_named_after_identity() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("mail");
        let log = AuditLogConfig::new(dest.to_str().unwrap(), "")
            .init(&["http://example.local"])
            .unwrap();

        let mut writer = log.mail_writer();
        assert_eq!(writer.write(TEST_DATA.as_bytes()).unwrap(), TEST_DATA.len());
        writer.close().unwrap();

        let path = log.mail_file().unwrap();
        assert_eq!(path, dest.join("example.local_mail.log"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), TEST_DATA);
    }

    #[test]
    fn mail_record_written_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLogConfig::new(dir.path().to_str().unwrap(), "")
            .init(&["site"])
            .unwrap();

        {
            let mut writer = log.mail_writer();
            writer.write_all(b"first ").unwrap();
            writer.write_all(b"record").unwrap();
        }

        let content = std::fs::read_to_string(log.mail_file().unwrap()).unwrap();
        assert_eq!(content, "first record");
    }

    #[test]
    fn concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLogConfig::new(dir.path().to_str().unwrap(), "")
            .init(&["site"])
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let mut writer = log.mail_writer();
                        // Several small writes per record.
                        write!(writer, "begin-{i} ").unwrap();
                        write!(writer, "{}", "x".repeat(64)).unwrap();
                        writeln!(writer, " end-{i}").unwrap();
                        writer.close().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(log.mail_file().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let id = line
                .strip_prefix("begin-")
                .and_then(|rest| rest.split(' ').next())
                .unwrap();
            assert!(line.ends_with(&format!(" end-{id}")), "interleaved: {line}");
        }
    }

    #[test]
    fn stream_sinks_accept_writes() {
        let log = AuditLogConfig::new("stdout", "stderr").init(&["site"]).unwrap();
        log.write_error(format_args!("{}", TEST_DATA));

        let mut writer = log.mail_writer();
        assert_eq!(writer.write(TEST_DATA.as_bytes()).unwrap(), TEST_DATA.len());
        writer.close().unwrap();
    }

    #[test]
    fn directory_creation_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let dest = blocker.join("logs");
        let err = AuditLogConfig::new("", dest.to_str().unwrap())
            .init::<&str>(&[])
            .unwrap_err();
        assert!(matches!(err, ConfigError::CreateDir { ref dir, .. } if dir == &dest));
        assert!(err.to_string().starts_with("Cannot create directory"));
    }

    #[test]
    fn init_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditLogConfig::new("", dir.path().to_str().unwrap());

        config.init(&["site"]).unwrap().write_error(format_args!("one"));
        config.init(&["site"]).unwrap().write_error(format_args!("two"));

        let content = std::fs::read_to_string(dir.path().join("site.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn file_stem_sanitizes_identity() {
        assert_eq!(file_stem("https://example.com:8080/"), "example.com_8080");
        assert_eq!(file_stem("   "), "localhost");
        assert_eq!(file_stem("../etc"), ".._etc");
    }
}
