use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use crate::communication::mesh::{MemoryProbe, MeshError, MeshNetwork, SendFlags};
use crate::communication::p2p::message::OutboundMessage;
use crate::core::mesh_context::MeshContext;
use crate::core::shutdown::ShutdownSignal;
use crate::mac_address::MacAddress;

/// ハートビートログを出す送信回数の間隔
pub const HEARTBEAT_EVERY: u32 = 100;

/// 成功した送信のうち、ハートビートを出すべきものかどうか
pub fn should_emit_heartbeat(counter: u32, succeeded: bool) -> bool {
    succeeded && counter % HEARTBEAT_EVERY == 0
}

/// 1回の送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub counter: u32,
    pub destination: MacAddress,
    pub result: Result<(), MeshError>,
    pub heartbeat: bool,
}

/// 親ノードへの定期P2P送信タスク
pub struct PeriodicTransmitter<N, M> {
    ctx: Arc<MeshContext>,
    network: Arc<N>,
    memory: M,
    interval: Duration,
    counter: u32,
    stop: Arc<ShutdownSignal>,
}

impl<N: MeshNetwork, M: MemoryProbe> PeriodicTransmitter<N, M> {
    /// 停止はコンテキストの停止シグナルに連動します
    pub fn new(ctx: Arc<MeshContext>, network: Arc<N>, memory: M, interval: Duration) -> Self {
        let stop = ctx.shutdown_signal().child();
        Self {
            ctx,
            network,
            memory,
            interval,
            counter: 0,
            stop,
        }
    }

    /// このタスクだけを止めるためのシグナルに差し替えます
    pub fn with_stop_signal(mut self, stop: Arc<ShutdownSignal>) -> Self {
        self.stop = stop;
        self
    }

    /// これまでに試行した送信回数
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// カウンタを進めて1回送信します。失敗してもループは継続できる
    pub fn send_next(&mut self) -> SendReport {
        self.counter = self.counter.wrapping_add(1);
        let counter = self.counter;
        let message = OutboundMessage::for_counter(counter);
        let state = self.ctx.snapshot();

        let result = self
            .network
            .send(&state.parent, message.as_bytes(), SendFlags::P2P);

        match &result {
            Err(e) => {
                error!(
                    "[#TX:{}][L:{}] parent:{}, self:{}, heap:{} [err:{:#x}] {}",
                    counter,
                    state.layer,
                    state.parent,
                    self.network.self_address(),
                    self.memory.free_heap_bytes(),
                    e.code(),
                    e
                );
            }
            Ok(()) if should_emit_heartbeat(counter, true) => {
                info!(
                    "[#TX:{}][L:{}][rtableSize:{}] parent:{}, self:{}, heap:{}",
                    counter,
                    state.layer,
                    self.network.routing_table_size(),
                    state.parent,
                    self.network.self_address(),
                    self.memory.free_heap_bytes()
                );
            }
            Ok(()) => {}
        }

        SendReport {
            counter,
            destination: state.parent,
            heartbeat: should_emit_heartbeat(counter, result.is_ok()),
            result,
        }
    }

    /// 停止シグナルが立つまで送信を繰り返します
    ///
    /// 戻り値は試行した送信回数です。
    pub fn run(mut self) -> u32 {
        info!("P2P送信タスク開始 (間隔: {:?})", self.interval);
        let shutdown = Arc::clone(&self.stop);

        while !shutdown.is_triggered() {
            self.send_next();
            if shutdown.wait_timeout(self.interval) {
                break;
            }
        }

        info!("P2P送信タスク終了 (送信回数: {})", self.counter);
        self.counter
    }
}
