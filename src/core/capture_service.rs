use log::{info, warn};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::hardware::camera::{CameraError, FrameSource};
use crate::storage::{FileStore, StorageError};

/// 撮影・保存処理のエラー
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("撮影に失敗しました: {0}")]
    Camera(#[from] CameraError),

    #[error("撮影データが空です")]
    EmptyFrame,

    #[error("画像の保存に失敗しました: {0}")]
    Storage(#[from] StorageError),
}

/// 保存済みフレームの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFrame {
    pub path: PathBuf,
    pub len: usize,
    /// 保存したデータのSHA-256（16進小文字）
    pub sha256: String,
}

/// SHA-256ハッシュを16進文字列で計算
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// 撮影してストレージへ保存するサービス
pub struct CaptureService;

impl CaptureService {
    /// 起動直後の露出・ホワイトバランスが安定するまでフレームを読み捨てます
    ///
    /// 失敗は数えるだけで中断しません。戻り値は取得に成功したフレーム数です。
    pub fn warm_up<C: FrameSource>(camera: &mut C, frames: u32) -> u32 {
        if frames == 0 {
            return 0;
        }

        info!("カメラウォームアップ: {}フレームを読み捨てます", frames);
        let mut captured = 0;
        let mut failed = 0;
        for _ in 0..frames {
            match camera.capture_jpeg() {
                Ok(_) => captured += 1,
                Err(_) => failed += 1,
            }
        }

        if failed > 0 {
            warn!("ウォームアップ中に{}フレームの取得に失敗しました", failed);
        }
        info!("カメラウォームアップ完了 ({}/{})", captured, frames);
        captured
    }

    /// 1フレーム撮影して `file_name` に保存します
    pub fn capture_and_save<C: FrameSource, S: FileStore>(
        camera: &mut C,
        store: &S,
        file_name: &str,
    ) -> Result<SavedFrame, CaptureError> {
        let data = camera.capture_jpeg()?;
        if data.is_empty() {
            warn!("撮影データが空のため保存しません");
            return Err(CaptureError::EmptyFrame);
        }

        let sha256 = sha256_hex(&data);
        let path = store.write_binary(file_name, &data)?;
        info!(
            "画像を保存しました: {} ({} bytes, sha256: {})",
            path.display(),
            data.len(),
            sha256
        );

        Ok(SavedFrame {
            path,
            len: data.len(),
            sha256,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MountedStore;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    struct ScriptedCamera {
        frames: VecDeque<Result<Vec<u8>, CameraError>>,
        calls: usize,
    }

    impl ScriptedCamera {
        fn new(frames: Vec<Result<Vec<u8>, CameraError>>) -> Self {
            Self {
                frames: frames.into(),
                calls: 0,
            }
        }
    }

    impl FrameSource for ScriptedCamera {
        fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
            self.calls += 1;
            self.frames
                .pop_front()
                .unwrap_or(Err(CameraError::CaptureFailed))
        }
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn warm_up_counts_successes_and_never_fails() {
        let mut camera = ScriptedCamera::new(vec![
            Ok(vec![1]),
            Err(CameraError::CaptureFailed),
            Ok(vec![2]),
        ]);
        assert_eq!(CaptureService::warm_up(&mut camera, 5), 2);
        assert_eq!(camera.calls, 5);
    }

    #[test]
    fn warm_up_zero_frames_does_not_touch_camera() {
        let mut camera = ScriptedCamera::new(vec![]);
        assert_eq!(CaptureService::warm_up(&mut camera, 0), 0);
        assert_eq!(camera.calls, 0);
    }

    #[test]
    fn capture_failure_propagates() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let mut camera = ScriptedCamera::new(vec![Err(CameraError::CaptureFailed)]);

        let err = CaptureService::capture_and_save(&mut camera, &store, "picture.jpg").unwrap_err();
        assert!(matches!(err, CaptureError::Camera(CameraError::CaptureFailed)));
        assert!(!dir.path().join("picture.jpg").exists());
    }
}
