/// ステータスLED（実機のみ）
#[cfg(feature = "esp")]
pub mod status_led;

#[cfg(feature = "esp")]
pub use status_led::StatusLed;

/// LEDの制御に関するエラー
#[derive(Debug, thiserror::Error)]
pub enum LedError {
    #[error("LEDの初期化に失敗しました: {0}")]
    InitFailed(String),

    #[error("LEDの点灯制御に失敗しました: {0}")]
    ControlFailed(String),
}
