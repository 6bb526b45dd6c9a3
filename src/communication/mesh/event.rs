use crate::mac_address::MacAddress;

/// メッシュスタックから通知されるライフサイクルイベント
///
/// `MESH_EVENT_*` の各イベントを、型付きペイロードを持つバリアントとして表します。
/// 対応表にないイベントIDは `Unknown` になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    Started,
    Stopped,
    ChildConnected { address: MacAddress, aid: u16 },
    ChildDisconnected { address: MacAddress, aid: u16 },
    RoutingTableAdd { changed: u16, new_size: u16 },
    RoutingTableRemove { changed: u16, new_size: u16 },
    NoParentFound { scan_times: i32 },
    ParentConnected { self_layer: u16, bssid: MacAddress, duty: u8 },
    ParentDisconnected { reason: u16 },
    LayerChanged { new_layer: u16 },
    ToDsState { reachable: bool },
    VoteStarted { attempts: i32, reason: u32, candidate: MacAddress },
    VoteStopped,
    RootAddress { address: MacAddress },
    RootSwitchRequest { reason: u32, candidate: MacAddress },
    RootSwitchAck,
    RootAskedYield { address: MacAddress, rssi: i32, capacity: i32 },
    RootFixed { is_fixed: bool },
    ChannelSwitch { channel: u8 },
    ScanDone { count: u8 },
    NetworkState { is_rootless: bool },
    StopReconnection,
    FindNetwork { channel: u8, router_bssid: MacAddress },
    RouterSwitch { ssid: String, channel: u8, bssid: MacAddress },
    PsParentDuty { duty: u8 },
    PsChildDuty { duty: u8, child: MacAddress },
    PsDeviceDuty { duty: u8 },
    Unknown { id: i32 },
}

impl MeshEvent {
    /// ログ用のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            MeshEvent::Started => "MESH_EVENT_STARTED",
            MeshEvent::Stopped => "MESH_EVENT_STOPPED",
            MeshEvent::ChildConnected { .. } => "MESH_EVENT_CHILD_CONNECTED",
            MeshEvent::ChildDisconnected { .. } => "MESH_EVENT_CHILD_DISCONNECTED",
            MeshEvent::RoutingTableAdd { .. } => "MESH_EVENT_ROUTING_TABLE_ADD",
            MeshEvent::RoutingTableRemove { .. } => "MESH_EVENT_ROUTING_TABLE_REMOVE",
            MeshEvent::NoParentFound { .. } => "MESH_EVENT_NO_PARENT_FOUND",
            MeshEvent::ParentConnected { .. } => "MESH_EVENT_PARENT_CONNECTED",
            MeshEvent::ParentDisconnected { .. } => "MESH_EVENT_PARENT_DISCONNECTED",
            MeshEvent::LayerChanged { .. } => "MESH_EVENT_LAYER_CHANGE",
            MeshEvent::ToDsState { .. } => "MESH_EVENT_TODS_STATE",
            MeshEvent::VoteStarted { .. } => "MESH_EVENT_VOTE_STARTED",
            MeshEvent::VoteStopped => "MESH_EVENT_VOTE_STOPPED",
            MeshEvent::RootAddress { .. } => "MESH_EVENT_ROOT_ADDRESS",
            MeshEvent::RootSwitchRequest { .. } => "MESH_EVENT_ROOT_SWITCH_REQ",
            MeshEvent::RootSwitchAck => "MESH_EVENT_ROOT_SWITCH_ACK",
            MeshEvent::RootAskedYield { .. } => "MESH_EVENT_ROOT_ASKED_YIELD",
            MeshEvent::RootFixed { .. } => "MESH_EVENT_ROOT_FIXED",
            MeshEvent::ChannelSwitch { .. } => "MESH_EVENT_CHANNEL_SWITCH",
            MeshEvent::ScanDone { .. } => "MESH_EVENT_SCAN_DONE",
            MeshEvent::NetworkState { .. } => "MESH_EVENT_NETWORK_STATE",
            MeshEvent::StopReconnection => "MESH_EVENT_STOP_RECONNECTION",
            MeshEvent::FindNetwork { .. } => "MESH_EVENT_FIND_NETWORK",
            MeshEvent::RouterSwitch { .. } => "MESH_EVENT_ROUTER_SWITCH",
            MeshEvent::PsParentDuty { .. } => "MESH_EVENT_PS_PARENT_DUTY",
            MeshEvent::PsChildDuty { .. } => "MESH_EVENT_PS_CHILD_DUTY",
            MeshEvent::PsDeviceDuty { .. } => "MESH_EVENT_PS_DEVICE_DUTY",
            MeshEvent::Unknown { .. } => "MESH_EVENT_UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_idf_event_ids() {
        assert_eq!(MeshEvent::Started.name(), "MESH_EVENT_STARTED");
        assert_eq!(
            MeshEvent::ParentConnected {
                self_layer: 1,
                bssid: MacAddress::ZERO,
                duty: 0
            }
            .name(),
            "MESH_EVENT_PARENT_CONNECTED"
        );
        assert_eq!(MeshEvent::Unknown { id: 99 }.name(), "MESH_EVENT_UNKNOWN");
    }
}
