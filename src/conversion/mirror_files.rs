use crate::conversion::ConversionError;
use std::fs;
use tracing::trace;

/// Files HTTrack keeps at the top of a mirror for its own use.
const HOUSEKEEPING_FILES: [&str; 8] = [
    "hts-log.txt",
    "hts-in_progress.lock",
    "hts-nohup.out",
    "hts-err.txt",
    "cookies.txt",
    "backblue.gif",
    "fade.gif",
    // the project page HTTrack generates, not a mirrored page
    "index.html",
];
const HOUSEKEEPING_DIRECTORIES: [&str; 1] = ["hts-cache"];

/// # List the mirrored files
///
/// Returns mirror-relative paths with `/` separators, sorted, skipping
/// HTTrack's own files. Symbolic links are not followed.
///
/// # Errors
///
/// Returns `ConversionError::Io` if a directory cannot be read.
pub fn mirror_files(mirror_directory: &std::path::Path) -> Result<Vec<String>, ConversionError> {
    let mut files = Vec::with_capacity(512);
    let mut pending = vec![String::new()];

    while let Some(relative_directory) = pending.pop() {
        let directory = mirror_directory.join(&relative_directory);
        let mut entries = fs::read_dir(&directory)
            .and_then(|read_dir| return read_dir.collect::<Result<Vec<_>, _>>())
            .map_err(ConversionError::io(&directory))?;
        entries.sort_by_key(fs::DirEntry::file_name);

        let is_top_level = relative_directory.is_empty();
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative_path = if is_top_level {
                name.clone()
            } else {
                format!("{relative_directory}/{name}")
            };
            let file_type = entry.file_type().map_err(ConversionError::io(entry.path()))?;

            if file_type.is_dir() {
                if !(is_top_level && HOUSEKEEPING_DIRECTORIES.contains(&name.as_str())) {
                    pending.push(relative_path);
                }
            } else if file_type.is_file() {
                if !(is_top_level && HOUSEKEEPING_FILES.contains(&name.as_str())) {
                    files.push(relative_path);
                }
            } else {
                trace!("not following {relative_path}");
            }
        }
    }
    files.sort();
    return Ok(files);
}
