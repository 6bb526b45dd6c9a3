use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::communication::mesh::{DhcpClient, MeshEvent, MeshNetwork};
use crate::communication::p2p::P2pLauncher;
use crate::core::mesh_context::MeshContext;
use crate::mac_address::MacAddress;

/// メッシュ接続状態モニター
///
/// ESP-IDFのイベントタスクから1イベントずつ呼ばれ、`MeshContext` の接続状態を更新します。
/// 親ノードへの初回接続時にP2Pタスクを1度だけ起動します。
pub struct MeshMonitor<N, D, L> {
    ctx: Arc<MeshContext>,
    network: Arc<N>,
    dhcp: D,
    launcher: L,
}

impl<N, D, L> MeshMonitor<N, D, L>
where
    N: MeshNetwork,
    D: DhcpClient,
    L: P2pLauncher,
{
    pub fn new(ctx: Arc<MeshContext>, network: Arc<N>, dhcp: D, launcher: L) -> Self {
        Self {
            ctx,
            network,
            dhcp,
            launcher,
        }
    }

    pub fn context(&self) -> &Arc<MeshContext> {
        &self.ctx
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// イベントを1件処理します。エラーはすべてログに記録し、呼び出し元へは返しません
    pub fn handle(&self, event: MeshEvent) {
        match event {
            MeshEvent::Started => {
                let layer = self.network.self_layer();
                self.ctx.set_disconnected(layer);
                info!("<MESH_EVENT_STARTED> layer:{}, mesh_id:{}", layer, self.ctx.mesh_id());
            }
            MeshEvent::Stopped => {
                let layer = self.network.self_layer();
                self.ctx.set_disconnected(layer);
                info!("<MESH_EVENT_STOPPED> layer:{}", layer);
            }
            MeshEvent::ChildConnected { address, aid } => {
                info!("<MESH_EVENT_CHILD_CONNECTED> aid:{}, {}", aid, address);
            }
            MeshEvent::ChildDisconnected { address, aid } => {
                info!("<MESH_EVENT_CHILD_DISCONNECTED> aid:{}, {}", aid, address);
            }
            MeshEvent::RoutingTableAdd { changed, new_size } => {
                warn!(
                    "<MESH_EVENT_ROUTING_TABLE_ADD> add {}, new:{}",
                    changed, new_size
                );
            }
            MeshEvent::RoutingTableRemove { changed, new_size } => {
                warn!(
                    "<MESH_EVENT_ROUTING_TABLE_REMOVE> remove {}, new:{}",
                    changed, new_size
                );
            }
            MeshEvent::NoParentFound { scan_times } => {
                info!("<MESH_EVENT_NO_PARENT_FOUND> scan times:{}", scan_times);
            }
            MeshEvent::ParentConnected {
                self_layer,
                bssid,
                duty,
            } => self.on_parent_connected(self_layer, bssid, duty),
            MeshEvent::ParentDisconnected { reason } => {
                let layer = self.network.self_layer();
                self.ctx.set_disconnected(layer);
                info!(
                    "<MESH_EVENT_PARENT_DISCONNECTED> reason:{}, layer:{}",
                    reason, layer
                );
            }
            MeshEvent::LayerChanged { new_layer: 0 } => {
                warn!("<MESH_EVENT_LAYER_CHANGE> 不正なレイヤー0を受信したため破棄します");
            }
            MeshEvent::LayerChanged { new_layer } => {
                let previous = self.ctx.snapshot().layer;
                self.ctx.set_layer(i32::from(new_layer));
                info!(
                    "<MESH_EVENT_LAYER_CHANGE> layer:{} --> {}{}",
                    previous,
                    new_layer,
                    self.role_suffix(i32::from(new_layer))
                );
            }
            MeshEvent::RootSwitchAck => {
                let layer = self.network.self_layer();
                if layer < 1 {
                    // スタックが未接続を返した場合は接続中として扱わない
                    self.ctx.set_disconnected(layer);
                    warn!("<MESH_EVENT_ROOT_SWITCH_ACK> layer:{} (未接続)", layer);
                    return;
                }
                let parent = self.network.parent_address();
                self.ctx.set_layer_and_parent(layer, parent);
                info!("<MESH_EVENT_ROOT_SWITCH_ACK> layer:{}, parent:{}", layer, parent);
            }
            MeshEvent::RootAddress { address } => {
                info!("<MESH_EVENT_ROOT_ADDRESS> root address:{}", address);
            }
            MeshEvent::RootFixed { is_fixed } => {
                info!(
                    "<MESH_EVENT_ROOT_FIXED> {}",
                    if is_fixed { "fixed" } else { "not fixed" }
                );
            }
            MeshEvent::RootSwitchRequest { reason, candidate } => {
                info!(
                    "<MESH_EVENT_ROOT_SWITCH_REQ> reason:{}, rc_addr:{}",
                    reason, candidate
                );
            }
            MeshEvent::RootAskedYield {
                address,
                rssi,
                capacity,
            } => {
                info!(
                    "<MESH_EVENT_ROOT_ASKED_YIELD> {}, rssi:{}, capacity:{}",
                    address, rssi, capacity
                );
            }
            MeshEvent::VoteStarted {
                attempts,
                reason,
                candidate,
            } => {
                info!(
                    "<MESH_EVENT_VOTE_STARTED> attempts:{}, reason:{}, rc_addr:{}",
                    attempts, reason, candidate
                );
            }
            MeshEvent::VoteStopped => info!("<MESH_EVENT_VOTE_STOPPED>"),
            MeshEvent::ToDsState { reachable } => {
                info!(
                    "<MESH_EVENT_TODS_STATE> state:{}",
                    if reachable { "reachable" } else { "unreachable" }
                );
            }
            MeshEvent::ChannelSwitch { channel } => {
                info!("<MESH_EVENT_CHANNEL_SWITCH> new channel:{}", channel);
            }
            MeshEvent::ScanDone { count } => {
                info!("<MESH_EVENT_SCAN_DONE> number:{}", count);
            }
            MeshEvent::NetworkState { is_rootless } => {
                info!("<MESH_EVENT_NETWORK_STATE> is_rootless:{}", is_rootless);
            }
            MeshEvent::StopReconnection => info!("<MESH_EVENT_STOP_RECONNECTION>"),
            MeshEvent::FindNetwork {
                channel,
                router_bssid,
            } => {
                info!(
                    "<MESH_EVENT_FIND_NETWORK> new channel:{}, router BSSID:{}",
                    channel, router_bssid
                );
            }
            MeshEvent::RouterSwitch {
                ssid,
                channel,
                bssid,
            } => {
                info!(
                    "<MESH_EVENT_ROUTER_SWITCH> new router:{}, channel:{}, {}",
                    ssid, channel, bssid
                );
            }
            MeshEvent::PsParentDuty { duty } => {
                info!("<MESH_EVENT_PS_PARENT_DUTY> duty:{}", duty);
            }
            MeshEvent::PsChildDuty { duty, child } => {
                info!("<MESH_EVENT_PS_CHILD_DUTY> cidx:{}, duty:{}", child, duty);
            }
            MeshEvent::PsDeviceDuty { duty } => {
                debug!("<MESH_EVENT_PS_DEVICE_DUTY> duty:{}", duty);
            }
            MeshEvent::Unknown { id } => {
                info!("未知のメッシュイベント id:{}", id);
            }
        }
    }

    fn on_parent_connected(&self, self_layer: u16, bssid: MacAddress, duty: u8) {
        // レイヤー0の親接続は接続中の不変条件 (layer >= 1) を壊すため破棄する
        if self_layer == 0 {
            warn!(
                "<MESH_EVENT_PARENT_CONNECTED> 不正なレイヤー0を受信したため破棄します (parent:{})",
                bssid
            );
            return;
        }

        let layer = i32::from(self_layer);
        self.ctx.set_parent_connected(layer, bssid);
        info!(
            "<MESH_EVENT_PARENT_CONNECTED> layer:{}, parent:{}{}, ID:{}, duty:{}",
            layer,
            bssid,
            self.role_suffix(layer),
            self.ctx.mesh_id(),
            duty
        );

        if self.network.is_root() {
            self.restart_dhcp();
        }

        self.start_p2p_once();
    }

    /// ルートノードは上流ルーターからIPを取り直す（停止してから開始）
    fn restart_dhcp(&self) {
        if let Err(e) = self.dhcp.stop() {
            warn!("DHCPクライアント停止に失敗: {} (code: {:#x})", e, e.code());
        }
        if let Err(e) = self.dhcp.start() {
            error!("DHCPクライアント開始に失敗: {} (code: {:#x})", e, e.code());
        }
    }

    fn start_p2p_once(&self) {
        if !self.ctx.try_claim_p2p_start() {
            debug!("P2Pタスクは起動済みです");
            return;
        }

        match self.launcher.launch(Arc::clone(&self.ctx)) {
            Ok(()) => info!("P2P送受信タスクを起動しました"),
            Err(e) => {
                // 次の親接続イベントで再試行できるように起動権を戻す
                self.ctx.release_p2p_start();
                error!("P2Pタスクの起動に失敗: {:?}", e);
            }
        }
    }

    fn role_suffix(&self, layer: i32) -> &'static str {
        if self.network.is_root() {
            "<ROOT>"
        } else if layer == 2 {
            "<layer2>"
        } else {
            ""
        }
    }
}
