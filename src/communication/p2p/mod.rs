pub mod launcher;
pub mod message;
pub mod receiver;
pub mod transmitter;

pub use launcher::{P2pTaskConfig, ThreadLauncher, DEFAULT_RECEIVE_POLL};
pub use message::OutboundMessage;
pub use receiver::P2pReceiver;
pub use transmitter::{should_emit_heartbeat, PeriodicTransmitter, SendReport, HEARTBEAT_EVERY};

use std::sync::Arc;

use crate::core::mesh_context::MeshContext;

/// P2Pタスクの起動方法
///
/// モニターは親ノード接続時にこれを1度だけ呼びます。実機ではスレッドを生成し、
/// テストでは呼び出し回数を記録するモックに差し替えます。
pub trait P2pLauncher: Send + Sync {
    fn launch(&self, ctx: Arc<MeshContext>) -> anyhow::Result<()>;
}
