use log::{info, warn};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::communication::mesh::{MemoryProbe, MeshNetwork};
use crate::communication::p2p::{P2pLauncher, P2pReceiver, PeriodicTransmitter};
use crate::core::mesh_context::MeshContext;

/// 受信タスクの待機タイムアウト
pub const DEFAULT_RECEIVE_POLL: Duration = Duration::from_secs(1);

/// P2Pタスクのスレッド設定
#[derive(Debug, Clone, Copy)]
pub struct P2pTaskConfig {
    pub interval: Duration,
    pub stack_size: usize,
    pub receive_poll: Duration,
}

/// 送信タスクと受信タスクを専用スレッド（FreeRTOSタスク）として起動する
pub struct ThreadLauncher<N, M> {
    network: Arc<N>,
    memory: M,
    config: P2pTaskConfig,
    handles: Mutex<Vec<JoinHandle<u32>>>,
}

impl<N, M> ThreadLauncher<N, M>
where
    N: MeshNetwork + 'static,
    M: MemoryProbe + Clone + 'static,
{
    pub fn new(network: Arc<N>, memory: M, config: P2pTaskConfig) -> Self {
        Self {
            network,
            memory,
            config,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// 起動済みタスクの終了を待ちます（停止シグナル発行後に使用）
    ///
    /// 各タスクの処理件数を起動順（送信、受信）で返します。
    pub fn join_all(&self) -> Vec<u32> {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(count) => Some(count),
                Err(_) => {
                    warn!("P2Pタスクがパニックで終了しました");
                    None
                }
            })
            .collect()
    }
}

/// スレッドで実行するタスク本体
type TaskBody = Box<dyn FnOnce() -> u32 + Send + 'static>;

impl<N, M> ThreadLauncher<N, M>
where
    N: MeshNetwork + 'static,
    M: MemoryProbe + Clone + 'static,
{
    /// 送信・受信タスクを起動します
    ///
    /// 2つのタスクはこの起動専用の停止シグナル（コンテキストの停止に連動）を共有します。
    /// 受信タスクの起動に失敗した場合はそのシグナルだけを立てて送信タスクを止めるため、
    /// 次回の起動は影響を受けません。
    fn launch_with<S>(&self, ctx: Arc<MeshContext>, mut spawn: S) -> anyhow::Result<()>
    where
        S: FnMut(&str, TaskBody) -> std::io::Result<JoinHandle<u32>>,
    {
        let stop = ctx.shutdown_signal().child();

        let transmitter = PeriodicTransmitter::new(
            Arc::clone(&ctx),
            Arc::clone(&self.network),
            self.memory.clone(),
            self.config.interval,
        )
        .with_stop_signal(Arc::clone(&stop));
        let tx = spawn("mesh_p2p_tx", Box::new(move || transmitter.run()))?;

        let receiver = P2pReceiver::new(
            Arc::clone(&ctx),
            Arc::clone(&self.network),
            self.config.receive_poll,
        )
        .with_stop_signal(Arc::clone(&stop));
        let rx = match spawn("mesh_p2p_rx", Box::new(move || receiver.run())) {
            Ok(handle) => handle,
            Err(e) => {
                stop.trigger();
                let _ = tx.join();
                return Err(e.into());
            }
        };

        info!(
            "P2Pタスク起動: stack={}B, interval={:?}",
            self.config.stack_size, self.config.interval
        );

        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.push(tx);
        handles.push(rx);
        Ok(())
    }
}

impl<N, M> P2pLauncher for ThreadLauncher<N, M>
where
    N: MeshNetwork + 'static,
    M: MemoryProbe + Clone + 'static,
{
    fn launch(&self, ctx: Arc<MeshContext>) -> anyhow::Result<()> {
        let stack_size = self.config.stack_size;
        self.launch_with(ctx, |name, body| {
            thread::Builder::new()
                .name(name.into())
                .stack_size(stack_size)
                .spawn(body)
        })
    }
}
