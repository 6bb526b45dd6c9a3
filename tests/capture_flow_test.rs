//! 撮影から保存までの流れのテスト（SDカードの代わりに一時ディレクトリを使用）

use mesh_cam_node::core::sha256_hex;
use mesh_cam_node::{
    AppController, CameraError, CaptureError, CaptureService, FileStore, FrameSource,
    MountedStore,
};
use std::time::Duration;
use tempfile::tempdir;

/// 渡されたフレームを順に返すカメラ
struct QueuedCamera {
    frames: Vec<Vec<u8>>,
}

impl FrameSource for QueuedCamera {
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        if self.frames.is_empty() {
            return Err(CameraError::CaptureFailed);
        }
        Ok(self.frames.remove(0))
    }
}

fn jpeg_like(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    data[0] = 0xFF;
    data[1] = 0xD8;
    data
}

#[test]
fn test_saved_file_matches_captured_bytes() {
    let dir = tempdir().unwrap();
    let store = MountedStore::new(dir.path());
    let frame = jpeg_like(4096);
    let mut camera = QueuedCamera {
        frames: vec![frame.clone()],
    };

    let saved = CaptureService::capture_and_save(&mut camera, &store, "picture.jpg").unwrap();

    let on_disk = std::fs::read(dir.path().join("picture.jpg")).unwrap();
    assert_eq!(on_disk, frame);
    assert_eq!(saved.len, frame.len());
    assert_eq!(saved.sha256, sha256_hex(&on_disk));
}

#[test]
fn test_empty_frame_is_not_written() {
    let dir = tempdir().unwrap();
    let store = MountedStore::new(dir.path());
    let mut camera = QueuedCamera {
        frames: vec![Vec::new()],
    };

    let result = CaptureService::capture_and_save(&mut camera, &store, "picture.jpg");

    assert!(matches!(result, Err(CaptureError::EmptyFrame)));
    assert!(!dir.path().join("picture.jpg").exists());
}

#[test]
fn test_initial_photo_overwrites_previous_file() {
    let dir = tempdir().unwrap();
    let store = MountedStore::new(dir.path());
    store.write_binary("picture.jpg", &jpeg_like(8192)).unwrap();

    // ウォームアップ2枚の後の3枚目が保存される
    let mut camera = QueuedCamera {
        frames: vec![jpeg_like(10), jpeg_like(20), jpeg_like(300)],
    };
    let saved = AppController::capture_initial_photo(
        &mut camera,
        &store,
        Duration::ZERO,
        2,
        "picture.jpg",
    )
    .unwrap();

    assert_eq!(saved.len, 300);
    assert_eq!(std::fs::read(&saved.path).unwrap(), jpeg_like(300));
}

#[test]
fn test_text_file_round_trip_reads_first_line() {
    let dir = tempdir().unwrap();
    let store = MountedStore::new(dir.path());

    store
        .write_text("hello.txt", "Hello mesh-cam!\nsecond line\n")
        .unwrap();

    assert_eq!(store.read_first_line("hello.txt").unwrap(), "Hello mesh-cam!");
}
