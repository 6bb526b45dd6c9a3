/// カメラ制御モジュール（実機のみ）
#[cfg(feature = "esp")]
pub mod controller;
/// フレームサイズ定義
pub mod frame_size;

#[cfg(feature = "esp")]
pub use controller::CameraController;
pub use frame_size::FrameSize;

/// カメラ操作エラー
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("カメラの初期化に失敗しました: {0}")]
    InitFailed(String),

    #[error("フレームバッファを取得できませんでした")]
    CaptureFailed,

    #[error("カメラセンサー設定に失敗しました: {0}")]
    SensorConfigFailed(String),

    #[error("カメラ電源ピンの制御に失敗しました: {0}")]
    PowerPinFailed(String),
}

/// JPEGフレームの供給元
///
/// 実機では `CameraController`、テストでは固定データを返すモックを使用します。
pub trait FrameSource {
    /// 1フレーム撮影し、JPEGデータをコピーして返す
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError>;
}
