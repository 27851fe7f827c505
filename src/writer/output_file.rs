use crate::{
    config::NamePattern,
    writer::{Compression, archive_record::info_record, writing_errors::WritingError},
};
use chrono::Utc;
use std::{
    fs::File,
    io::Write as _,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use warc::{BufferedBody, Record, WarcHeader};

/// Where a record ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecord {
    pub file_name: String,
    /// Byte offset of the record within its file.
    pub offset: u64,
    /// Number of bytes the record occupies, after compression.
    pub length: u64,
}

struct OpenFile {
    sequence: u32,
    path: PathBuf,
    file_name: String,
    file: File,
    bytes_written: u64,
    /// Records written after the warcinfo record.
    content_records: usize,
    warcinfo_id: String,
}

enum OutputState {
    Closed,
    Open(OpenFile),
}

/// Writes records to a numbered set of output files.
///
/// The writer is a two state machine driven only by [`RolloverWriter::write`]
/// and [`RolloverWriter::close`]:
///
/// * `Closed`: the next write opens file `next_sequence`
/// * `Open`: records are appended until the next one would push the file
///   past the size target, at which point the file is closed and the next
///   one opened
///
/// Every file starts with a warcinfo record and a record is never split.
/// A file that holds only its warcinfo record accepts the next record
/// whatever its size, so oversized records still get written.
pub struct RolloverWriter {
    directory: PathBuf,
    pattern: NamePattern,
    size_target: u64,
    compression: Compression,
    warcinfo_fields: String,
    state: OutputState,
    next_sequence: u32,
    files: Vec<PathBuf>,
}
impl RolloverWriter {
    #[must_use]
    pub fn new(
        directory: &Path,
        pattern: NamePattern,
        size_target: u64,
        compression: Compression,
        warcinfo_fields: String,
    ) -> Self {
        return Self {
            directory: directory.to_path_buf(),
            pattern,
            size_target,
            compression,
            warcinfo_fields,
            state: OutputState::Closed,
            next_sequence: 0,
            files: Vec::new(),
        };
    }

    /// # Write a record
    ///
    /// Sets `WARC-Warcinfo-ID` to the warcinfo record of the file the
    /// record lands in.
    ///
    /// # Errors
    ///
    /// Returns a `WritingError` if the record cannot be serialised or an
    /// output file cannot be created or written. A failed write is cut
    /// back off the file, so everything before it stays readable.
    pub fn write(
        &mut self,
        record: &mut Record<BufferedBody>,
    ) -> Result<WrittenRecord, WritingError> {
        if matches!(self.state, OutputState::Closed) {
            self.open_next()?;
        }
        let mut serialised = self.serialise_for_current(record)?;

        if let OutputState::Open(open_file) = &self.state {
            let projected = open_file.bytes_written + byte_count(&serialised);
            if open_file.content_records > 0 && projected > self.size_target {
                debug!(
                    "{} would reach {projected} bytes, rolling over",
                    open_file.file_name
                );
                self.close()?;
                self.open_next()?;
                serialised = self.serialise_for_current(record)?;
            }
        }

        let OutputState::Open(open_file) = &mut self.state else {
            return Err(WritingError::Closed);
        };
        let offset = open_file.bytes_written;
        append(open_file, &serialised)?;
        open_file.content_records += 1;

        return Ok(WrittenRecord {
            file_name: open_file.file_name.clone(),
            offset,
            length: byte_count(&serialised),
        });
    }

    /// # Close the current file
    ///
    /// Does nothing when no file is open. The next write opens a new file.
    ///
    /// # Errors
    ///
    /// Returns `WritingError::File` if the file cannot be synced to disk.
    pub fn close(&mut self) -> Result<(), WritingError> {
        let OutputState::Open(open_file) = std::mem::replace(&mut self.state, OutputState::Closed)
        else {
            return Ok(());
        };
        info!(
            "closed {} ({} records, {} bytes)",
            open_file.file_name,
            open_file.content_records + 1,
            open_file.bytes_written
        );
        return open_file.file.sync_all().map_err(|source| {
            return WritingError::File {
                path: open_file.path,
                source,
            };
        });
    }

    /// Paths of every file opened so far, in sequence order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        return &self.files;
    }

    fn serialise_for_current(
        &self,
        record: &mut Record<BufferedBody>,
    ) -> Result<Vec<u8>, WritingError> {
        if let OutputState::Open(open_file) = &self.state {
            record.set_header(WarcHeader::WarcInfoID, open_file.warcinfo_id.clone())?;
        }
        return self.compression.serialise(record);
    }

    fn open_next(&mut self) -> Result<(), WritingError> {
        let sequence = self.next_sequence;
        let file_name = self.pattern.file_name(sequence);
        let path = self.directory.join(&file_name);

        let file = File::create(&path).map_err(|source| {
            return WritingError::File {
                path: path.clone(),
                source,
            };
        })?;
        info!("writing {}", path.display());

        let warcinfo = info_record(&file_name, &self.warcinfo_fields, Utc::now())?;
        let warcinfo_id = warcinfo
            .header(WarcHeader::RecordID)
            .map(|record_id| return record_id.into_owned())
            .unwrap_or_default();
        let serialised = self.compression.serialise(&warcinfo)?;

        let mut open_file = OpenFile {
            sequence,
            path: path.clone(),
            file_name,
            file,
            bytes_written: 0,
            content_records: 0,
            warcinfo_id,
        };
        append(&mut open_file, &serialised)?;
        debug!("opened output file {} as sequence {}", open_file.file_name, open_file.sequence);

        self.files.push(path);
        self.next_sequence += 1;
        self.state = OutputState::Open(open_file);
        return Ok(());
    }
}
impl Drop for RolloverWriter {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("{error}");
        }
    }
}

/// Append one whole record, or nothing at all.
fn append(open_file: &mut OpenFile, serialised: &[u8]) -> Result<(), WritingError> {
    if let Err(source) = open_file.file.write_all(serialised) {
        if let Err(truncate_error) = open_file.file.set_len(open_file.bytes_written) {
            warn!(
                "could not cut partial record from {}: {truncate_error}",
                open_file.path.display()
            );
        }
        return Err(WritingError::File {
            path: open_file.path.clone(),
            source,
        });
    }
    open_file.bytes_written += byte_count(serialised);
    return Ok(());
}

fn byte_count(bytes: &[u8]) -> u64 {
    return u64::try_from(bytes.len()).unwrap_or(u64::MAX);
}
