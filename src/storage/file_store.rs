use log::{error, info};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::storage::{FileStore, StorageError};

/// 先頭行読み込み用の行バッファサイズ（終端を含む）
pub const LINE_BUFFER_SIZE: usize = 64;

/// マウントポイント配下のファイルを `std::fs` で扱うストア
///
/// 実機ではSDカードのマウントポイント（`/sdcard`）、ホストでは任意のディレクトリを使います。
#[derive(Debug, Clone)]
pub struct MountedStore {
    root: PathBuf,
}

impl MountedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_all(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.path_of(name);

        let mut file = File::create(&path).map_err(|source| {
            error!("書き込み用にファイルを開けません: {}", path.display());
            StorageError::Open {
                path: path.clone(),
                source,
            }
        })?;

        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|source| {
                error!("ファイル書き込みに失敗: {} ({} bytes)", path.display(), data.len());
                StorageError::Write {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok(path)
    }
}

impl FileStore for MountedStore {
    fn write_binary(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        info!("バイナリファイル書き込み: {} ({} bytes)", self.path_of(name).display(), data.len());
        let path = self.write_all(name, data)?;
        info!("バイナリファイル書き込み完了: {} bytes", data.len());
        Ok(path)
    }

    fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, StorageError> {
        info!("テキストファイル書き込み: {}", self.path_of(name).display());
        let path = self.write_all(name, text.as_bytes())?;
        info!("テキストファイル書き込み完了");
        Ok(path)
    }

    fn read_first_line(&self, name: &str) -> Result<String, StorageError> {
        let path = self.path_of(name);
        info!("テキストファイル読み込み: {}", path.display());

        let file = File::open(&path).map_err(|source| {
            error!("読み込み用にファイルを開けません: {}", path.display());
            StorageError::Open {
                path: path.clone(),
                source,
            }
        })?;

        // 行バッファに収まる分だけ読む（終端1バイト分を除く）
        let mut buf = Vec::with_capacity(LINE_BUFFER_SIZE);
        file.take((LINE_BUFFER_SIZE - 1) as u64)
            .read_to_end(&mut buf)
            .map_err(|source| StorageError::Read {
                path: path.clone(),
                source,
            })?;

        if let Some(newline) = buf.iter().position(|&b| b == b'\n') {
            buf.truncate(newline);
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        info!("ファイル内容: '{}'", line);
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn binary_write_is_byte_exact() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let data = [0xFF, 0xD8, 0x00, 0x0A, 0xFF, 0xD9];

        let path = store.write_binary("picture.jpg", &data).unwrap();

        assert_eq!(path, dir.path().join("picture.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn first_line_strips_newline() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        store.write_text("hello.txt", "Hello SD!\nsecond line\n").unwrap();

        assert_eq!(store.read_first_line("hello.txt").unwrap(), "Hello SD!");
    }

    #[test]
    fn first_line_is_limited_to_line_buffer() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        store.write_text("long.txt", &"a".repeat(200)).unwrap();

        let line = store.read_first_line("long.txt").unwrap();
        assert_eq!(line.len(), LINE_BUFFER_SIZE - 1);
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        store.write_text("note.txt", "first version").unwrap();
        store.write_text("note.txt", "v2").unwrap();

        assert_eq!(store.read_first_line("note.txt").unwrap(), "v2");
    }

    #[test]
    fn missing_file_reports_open_error() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());

        let err = store.read_first_line("missing.txt").unwrap_err();
        assert!(matches!(err, StorageError::Open { .. }));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path().join("not-mounted"));

        let err = store.write_binary("picture.jpg", b"jpeg").unwrap_err();
        assert!(matches!(err, StorageError::Open { .. }));
    }
}
