use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::communication::mesh::{MeshId, UNCONNECTED_LAYER};
use crate::core::shutdown::ShutdownSignal;
use crate::mac_address::MacAddress;

/// メッシュ接続状態のスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    /// 親からのホップ数。-1 は未接続
    pub layer: i32,
    /// 現在の親ノード。`connected` が true の時のみ有効
    pub parent: MacAddress,
    pub connected: bool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            layer: UNCONNECTED_LAYER,
            parent: MacAddress::ZERO,
            connected: false,
        }
    }
}

/// モニターとP2Pタスクで共有するコンテキスト
///
/// `main` が所有し `Arc` で配布します。状態の書き込みはモニターのみが行い、
/// 送信タスクは `snapshot()` で (layer, parent, connected) を一貫した組として読みます。
#[derive(Debug)]
pub struct MeshContext {
    mesh_id: MeshId,
    state: Mutex<ConnectivityState>,
    p2p_started: AtomicBool,
    shutdown: ShutdownSignal,
}

impl MeshContext {
    pub fn new(mesh_id: MeshId) -> Self {
        Self {
            mesh_id,
            state: Mutex::new(ConnectivityState::default()),
            p2p_started: AtomicBool::new(false),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    /// 現在の接続状態
    pub fn snapshot(&self) -> ConnectivityState {
        *self.lock()
    }

    /// 親ノード接続。layer と parent を同時に更新する
    pub(crate) fn set_parent_connected(&self, layer: i32, parent: MacAddress) {
        let mut state = self.lock();
        state.layer = layer;
        state.parent = parent;
        state.connected = true;
    }

    /// 切断（開始/停止/親切断時）。layer はスタックの自己申告値で更新する
    pub(crate) fn set_disconnected(&self, layer: i32) {
        let mut state = self.lock();
        state.layer = layer;
        state.connected = false;
    }

    pub(crate) fn set_layer(&self, layer: i32) {
        self.lock().layer = layer;
    }

    /// ルート切替完了時にスタックから読み直した値で上書きする
    pub(crate) fn set_layer_and_parent(&self, layer: i32, parent: MacAddress) {
        let mut state = self.lock();
        state.layer = layer;
        state.parent = parent;
    }

    /// P2Pタスク起動権を取得します。プロセス中で最初の1回だけ `true`
    pub(crate) fn try_claim_p2p_start(&self) -> bool {
        self.p2p_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 起動失敗時に起動権を戻す
    pub(crate) fn release_p2p_start(&self) {
        self.p2p_started.store(false, Ordering::Release);
    }

    pub fn is_p2p_started(&self) -> bool {
        self.p2p_started.load(Ordering::Acquire)
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// P2Pタスクに停止を要求する
    pub fn request_shutdown(&self) {
        self.shutdown.trigger();
    }

    fn lock(&self) -> MutexGuard<'_, ConnectivityState> {
        // 状態は Copy の値のみなので、ポイズンされても中身はそのまま使える
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MeshContext {
        MeshContext::new(MeshId([0x77; 6]))
    }

    #[test]
    fn starts_unconnected() {
        let ctx = context();
        let state = ctx.snapshot();
        assert_eq!(state.layer, -1);
        assert!(!state.connected);
        assert!(!ctx.is_p2p_started());
    }

    #[test]
    fn parent_connected_sets_all_fields() {
        let ctx = context();
        let parent = MacAddress::new([1, 2, 3, 4, 5, 6]);
        ctx.set_parent_connected(2, parent);
        assert_eq!(
            ctx.snapshot(),
            ConnectivityState {
                layer: 2,
                parent,
                connected: true
            }
        );
    }

    #[test]
    fn disconnect_keeps_last_parent_but_clears_flag() {
        let ctx = context();
        let parent = MacAddress::new([1, 2, 3, 4, 5, 6]);
        ctx.set_parent_connected(3, parent);
        ctx.set_disconnected(-1);
        let state = ctx.snapshot();
        assert!(!state.connected);
        assert_eq!(state.layer, -1);
        assert_eq!(state.parent, parent);
    }

    #[test]
    fn p2p_start_claim_is_single_shot() {
        let ctx = context();
        assert!(ctx.try_claim_p2p_start());
        assert!(!ctx.try_claim_p2p_start());
        assert!(ctx.is_p2p_started());

        ctx.release_p2p_start();
        assert!(ctx.try_claim_p2p_start());
    }

    #[test]
    fn request_shutdown_raises_signal() {
        let ctx = context();
        assert!(!ctx.shutdown_signal().is_triggered());
        ctx.request_shutdown();
        assert!(ctx.shutdown_signal().is_triggered());
    }
}
