//! JSON state files on local disk
//!
//! Writes go to `{path}.tmp` first and are renamed over the target, so a
//! reader sees either the previous file or the new one, never a partial write.

use crate::error::{Result, SieveError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// `Ok(None)` when the file does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SieveError::io(path, e)),
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| SieveError::persist(path, e))
}

pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SieveError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let file = File::create(&temp_path).map_err(|e| SieveError::io(&temp_path, e))?;
    let mut writer = BufWriter::new(file);
    let encoded = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    encoded.map_err(|e| SieveError::persist(path, e))?;

    let file = writer
        .into_inner()
        .map_err(|e| SieveError::io(&temp_path, e.into_error()))?;
    file.sync_all().map_err(|e| SieveError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| SieveError::io(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("progress.json");

        assert_eq!(read_json::<Vec<String>>(&path).unwrap(), None);

        write_json_atomic(&path, &vec!["a".to_string()], false).unwrap();
        write_json_atomic(&path, &vec!["b".to_string()], true).unwrap();
        assert_eq!(read_json::<Vec<String>>(&path).unwrap(), Some(vec!["b".to_string()]));
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_corrupt_file_is_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = read_json::<Vec<String>>(&path);
        assert!(matches!(result, Err(SieveError::Persist { .. })));
    }
}
