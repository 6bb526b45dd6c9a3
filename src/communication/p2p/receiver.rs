use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::communication::mesh::{MeshError, MeshNetwork, Received, MESH_MAX_PAYLOAD};
use crate::core::mesh_context::MeshContext;
use crate::core::shutdown::ShutdownSignal;

/// 受信ログを info レベルで出す間隔
const RX_LOG_EVERY: u32 = 100;

/// P2P受信タスク
///
/// 受信ごとに送信元とサイズをログに記録します。受信エラーでは停止しません。
pub struct P2pReceiver<N> {
    ctx: Arc<MeshContext>,
    network: Arc<N>,
    poll: Duration,
    received: u32,
    buf: Vec<u8>,
    stop: Arc<ShutdownSignal>,
}

impl<N: MeshNetwork> P2pReceiver<N> {
    pub fn new(ctx: Arc<MeshContext>, network: Arc<N>, poll: Duration) -> Self {
        let stop = ctx.shutdown_signal().child();
        Self {
            ctx,
            network,
            poll,
            received: 0,
            buf: vec![0; MESH_MAX_PAYLOAD],
            stop,
        }
    }

    /// このタスクだけを止めるためのシグナルに差し替えます
    pub fn with_stop_signal(mut self, stop: Arc<ShutdownSignal>) -> Self {
        self.stop = stop;
        self
    }

    /// これまでに受信したメッセージ数
    pub fn received(&self) -> u32 {
        self.received
    }

    /// 1回受信を待ちます
    ///
    /// タイムアウトは `Ok(None)`、その他のエラーは呼び出し元へ返します。
    pub fn receive_once(&mut self) -> Result<Option<Received>, MeshError> {
        match self.network.receive(&mut self.buf, self.poll) {
            Ok(received) => {
                self.received = self.received.wrapping_add(1);
                let layer = self.ctx.snapshot().layer;
                if self.received % RX_LOG_EVERY == 0 {
                    info!(
                        "[#RX:{}][L:{}] from:{}, size:{}",
                        self.received, layer, received.from, received.len
                    );
                } else {
                    debug!(
                        "[#RX:{}][L:{}] from:{}, size:{}",
                        self.received, layer, received.from, received.len
                    );
                }
                Ok(Some(received))
            }
            Err(MeshError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 直近に受信したペイロード
    pub fn last_payload(&self, received: &Received) -> &[u8] {
        &self.buf[..received.len.min(self.buf.len())]
    }

    /// 停止シグナルが立つまで受信を繰り返します
    pub fn run(mut self) -> u32 {
        info!("P2P受信タスク開始");
        let shutdown = Arc::clone(&self.stop);

        while !shutdown.is_triggered() {
            if let Err(e) = self.receive_once() {
                warn!("メッシュ受信エラー: {} (code: {:#x})", e, e.code());
                if shutdown.wait_timeout(self.poll) {
                    break;
                }
            }
        }

        info!("P2P受信タスク終了 (受信数: {})", self.received);
        self.received
    }
}
