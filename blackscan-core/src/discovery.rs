//! Finding video files to queue for analysis.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Extensions treated as video containers during directory scans,
/// matched case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "mts", "ts", "vob", "webm",
    "wmv",
];

/// Expands a mix of file and directory paths into a sorted, deduplicated
/// list of video files.
///
/// Directories are scanned recursively and filtered by [`VIDEO_EXTENSIONS`];
/// explicitly listed files are taken as-is. A path that does not exist is an
/// error, as is an expansion that yields nothing.
pub fn collect_video_files(inputs: &[PathBuf]) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            scan_directory(input, &mut files)?;
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(CoreError::PathError(format!(
                "input path not found: {}",
                input.display()
            )));
        }
    }

    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }
    log::debug!("Collected {} video file(s)", files.len());
    Ok(files)
}

fn scan_directory(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_directory(&path, files)?;
        } else if has_video_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn test_recursive_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        fs::create_dir(&nested).unwrap();
        touch(&dir.path().join("b.mp4"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("A.MKV"));
        touch(&nested.join("c.webm"));

        let files = collect_video_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0] < w[1]));
        assert!(files.iter().any(|f| f.ends_with("A.MKV")));
        assert!(!files.iter().any(|f| f.ends_with("notes.txt")));
    }

    #[test]
    fn test_explicit_file_taken_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("capture.bin");
        touch(&odd);
        let files = collect_video_files(&[odd.clone()]).unwrap();
        assert_eq!(files, vec![odd]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.mp4");
        touch(&file);
        let files =
            collect_video_files(&[file.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_empty_scan_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("readme.md"));
        assert!(matches!(
            collect_video_files(&[dir.path().to_path_buf()]),
            Err(CoreError::NoFilesFound)
        ));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let missing = PathBuf::from("/definitely/not/here.mp4");
        assert!(matches!(
            collect_video_files(&[missing]),
            Err(CoreError::PathError(_))
        ));
    }
}
