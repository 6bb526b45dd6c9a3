/*!
 * # Mesh Cam Node Library
 *
 * ESP32-CAM (AI-Thinker) で撮影した画像をSDカードへ保存し、
 * ESP-WIFI-MESH に参加して親ノードへ定期的にP2Pメッセージを送るためのライブラリ
 *
 * ## モジュール構成
 * - `core`: アプリケーションの核となる機能（設定、メッシュ状態監視、撮影・保存、制御）
 * - `communication`: 通信機能（メッシュ抽象、P2P送受信タスク、ネットワーク管理）
 * - `hardware`: ハードウェア制御（カメラ、LED、人感センサー、ピン設定）
 * - `storage`: SDカードとファイル操作
 *
 * ESP-IDF に依存する部分は `esp` フィーチャーで有効になります。
 * フィーチャーなしではホスト上でロジックのみビルド・テストできます。
 */

// 公開モジュール
pub mod communication;
pub mod core;
pub mod hardware;
pub mod mac_address;
pub mod storage;

// 内部で使用する型をまとめてエクスポート
pub use communication::mesh::{
    DhcpClient, MemoryProbe, MeshError, MeshEvent, MeshId, MeshNetwork, Received, SendFlags,
};
pub use communication::p2p::{
    OutboundMessage, P2pLauncher, P2pReceiver, P2pTaskConfig, PeriodicTransmitter, ThreadLauncher,
};
pub use core::{
    AppConfig, AppController, CaptureError, CaptureService, ConfigError, ConnectivityState,
    IdlePlan, IdleStats, MeshContext, MeshMonitor, MotionFlag, MotionInput, SavedFrame,
    ShutdownSignal,
};
pub use hardware::{CameraError, FrameSize, FrameSource, LedError};
pub use mac_address::MacAddress;
pub use storage::{CardInfo, FileStore, FormatPolicy, MountedStore, SdBusWidth, StorageError};

#[cfg(feature = "esp")]
pub use communication::mesh::{EspMemoryProbe, EspMesh, EspStaDhcp};
#[cfg(feature = "esp")]
pub use hardware::{CameraController, CameraPins, PirSensor, StatusLed};
#[cfg(feature = "esp")]
pub use storage::SdCard;

/// ライブラリのバージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
