/// コアシステムモジュール
pub mod app_controller;
pub mod capture_service;
pub mod config;
pub mod config_validation;
pub mod mesh_context;
pub mod mesh_monitor;
pub mod motion;
pub mod shutdown;

pub use app_controller::{AppController, IdlePlan, IdleStats};
pub use capture_service::{sha256_hex, CaptureError, CaptureService, SavedFrame};
pub use config::{AppConfig, ConfigError, RawConfig};
pub use mesh_context::{ConnectivityState, MeshContext};
pub use mesh_monitor::MeshMonitor;
pub use motion::{MotionFlag, MotionInput};
pub use shutdown::ShutdownSignal;
