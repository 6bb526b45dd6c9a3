/// ハードウェア制御モジュール
pub mod camera;
pub mod led;
#[cfg(feature = "esp")]
pub mod motion_sensor;
#[cfg(feature = "esp")]
pub mod pins;

pub use camera::{CameraError, FrameSize, FrameSource};
pub use led::LedError;
#[cfg(feature = "esp")]
pub use camera::CameraController;
#[cfg(feature = "esp")]
pub use led::StatusLed;
#[cfg(feature = "esp")]
pub use motion_sensor::PirSensor;
#[cfg(feature = "esp")]
pub use pins::CameraPins;
