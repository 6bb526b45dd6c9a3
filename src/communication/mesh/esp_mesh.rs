use esp_idf_svc::sys::{self, esp, EspError};
use log::{info, warn};
use std::ffi::c_void;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use crate::communication::mesh::{
    DhcpClient, MemoryProbe, MeshError, MeshEvent, MeshNetwork, Received, SendFlags,
};
use crate::communication::p2p::P2pLauncher;
use crate::core::mesh_monitor::MeshMonitor;
use crate::mac_address::MacAddress;

/// ESP-WIFI-MESH スタック (`esp_mesh_*`) のラッパー
///
/// `esp_mesh_start()` 完了後に使用します。
#[derive(Debug, Default, Clone, Copy)]
pub struct EspMesh;

impl EspMesh {
    pub fn new() -> Self {
        Self
    }
}

impl MeshNetwork for EspMesh {
    fn self_layer(&self) -> i32 {
        unsafe { sys::esp_mesh_get_layer() }
    }

    fn parent_address(&self) -> MacAddress {
        let mut parent = sys::mesh_addr_t { addr: [0; 6] };
        let err = unsafe { sys::esp_mesh_get_parent_bssid(&mut parent) };
        if err != sys::ESP_OK {
            warn!("親BSSIDの取得に失敗 (code: {:#x})", err);
            return MacAddress::ZERO;
        }
        MacAddress::new(unsafe { parent.addr })
    }

    fn is_root(&self) -> bool {
        unsafe { sys::esp_mesh_is_root() }
    }

    fn routing_table_size(&self) -> usize {
        let size = unsafe { sys::esp_mesh_get_routing_table_size() };
        usize::try_from(size).unwrap_or(0)
    }

    fn self_address(&self) -> MacAddress {
        let mut mac = [0u8; 6];
        let err = unsafe { sys::esp_wifi_get_mac(sys::wifi_interface_t_WIFI_IF_STA, mac.as_mut_ptr()) };
        if err != sys::ESP_OK {
            return MacAddress::ZERO;
        }
        MacAddress::new(mac)
    }

    fn send(&self, to: &MacAddress, payload: &[u8], flags: SendFlags) -> Result<(), MeshError> {
        let size = u16::try_from(payload.len()).map_err(|_| MeshError::Send {
            code: sys::ESP_ERR_MESH_EXCEED_MTU as i32,
        })?;
        let dest = sys::mesh_addr_t { addr: to.octets() };
        // esp_mesh_send はデータを読み取るだけだが、バインディングは *mut を要求する
        let data = sys::mesh_data_t {
            data: payload.as_ptr() as *mut u8,
            size,
            proto: sys::mesh_proto_t_MESH_PROTO_BIN,
            tos: sys::mesh_tos_t_MESH_TOS_P2P,
        };

        let err = unsafe {
            sys::esp_mesh_send(&dest, &data, flags.0 as i32, std::ptr::null(), 0)
        };
        if err == sys::ESP_OK {
            Ok(())
        } else {
            Err(MeshError::Send { code: err })
        }
    }

    fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Received, MeshError> {
        let mut from = sys::mesh_addr_t { addr: [0; 6] };
        let mut data = sys::mesh_data_t {
            data: buf.as_mut_ptr(),
            size: u16::try_from(buf.len()).unwrap_or(u16::MAX),
            proto: sys::mesh_proto_t_MESH_PROTO_BIN,
            tos: sys::mesh_tos_t_MESH_TOS_P2P,
        };
        let mut flag: i32 = 0;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        let err = unsafe {
            sys::esp_mesh_recv(
                &mut from,
                &mut data,
                timeout_ms,
                &mut flag,
                std::ptr::null_mut(),
                0,
            )
        };

        if err == sys::ESP_OK {
            Ok(Received {
                from: MacAddress::new(unsafe { from.addr }),
                len: usize::from(data.size),
            })
        } else if err == sys::ESP_ERR_MESH_TIMEOUT as i32 {
            Err(MeshError::Timeout)
        } else {
            Err(MeshError::Receive { code: err })
        }
    }
}

/// メッシュSTAインターフェースのDHCPクライアント
pub struct EspStaDhcp {
    netif: *mut sys::esp_netif_t,
}

// netif ハンドルはESP-IDF側が所有し、esp_netif API はスレッドセーフ
unsafe impl Send for EspStaDhcp {}
unsafe impl Sync for EspStaDhcp {}

impl EspStaDhcp {
    /// # Safety
    ///
    /// `netif` は `esp_netif_create_default_wifi_mesh_netifs` が作成した
    /// STAインターフェースで、プロセス終了まで有効であること。
    pub unsafe fn new(netif: *mut sys::esp_netif_t) -> Self {
        Self { netif }
    }
}

impl DhcpClient for EspStaDhcp {
    fn stop(&self) -> Result<(), MeshError> {
        let err = unsafe { sys::esp_netif_dhcpc_stop(self.netif) };
        // 既に停止済みの場合は成功扱い
        if err == sys::ESP_OK || err == sys::ESP_ERR_ESP_NETIF_DHCP_ALREADY_STOPPED as i32 {
            Ok(())
        } else {
            Err(MeshError::Dhcp { code: err })
        }
    }

    fn start(&self) -> Result<(), MeshError> {
        let err = unsafe { sys::esp_netif_dhcpc_start(self.netif) };
        if err == sys::ESP_OK || err == sys::ESP_ERR_ESP_NETIF_DHCP_ALREADY_STARTED as i32 {
            Ok(())
        } else {
            Err(MeshError::Dhcp { code: err })
        }
    }
}

/// `esp_get_free_heap_size` による空きヒープ取得
#[derive(Debug, Default, Clone, Copy)]
pub struct EspMemoryProbe;

impl MemoryProbe for EspMemoryProbe {
    fn free_heap_bytes(&self) -> u32 {
        unsafe { sys::esp_get_free_heap_size() }
    }
}

/// メッシュイベントとIP取得イベントのハンドラを登録します
///
/// モニターはイベントループが生きている間参照されるため、プロセス終了まで解放しません。
pub fn register_event_handlers<N, D, L>(monitor: Arc<MeshMonitor<N, D, L>>) -> Result<(), EspError>
where
    N: MeshNetwork + 'static,
    D: DhcpClient + 'static,
    L: P2pLauncher + 'static,
{
    let arg = Arc::into_raw(monitor) as *mut c_void;

    unsafe {
        esp!(sys::esp_event_handler_register(
            sys::MESH_EVENT,
            sys::ESP_EVENT_ANY_ID,
            Some(mesh_event_handler::<N, D, L>),
            arg,
        ))?;
        esp!(sys::esp_event_handler_register(
            sys::IP_EVENT,
            sys::ip_event_t_IP_EVENT_STA_GOT_IP as i32,
            Some(ip_event_handler),
            std::ptr::null_mut(),
        ))?;
    }

    info!("メッシュイベントハンドラを登録しました");
    Ok(())
}

/// メッシュイベントコールバック（ESP-IDFイベントタスク上で実行）
extern "C" fn mesh_event_handler<N, D, L>(
    arg: *mut c_void,
    _event_base: sys::esp_event_base_t,
    event_id: i32,
    event_data: *mut c_void,
) where
    N: MeshNetwork,
    D: DhcpClient,
    L: P2pLauncher,
{
    if arg.is_null() {
        return;
    }
    let monitor = unsafe { &*(arg as *const MeshMonitor<N, D, L>) };
    let event = unsafe { mesh_event_from_raw(event_id, event_data) };
    monitor.handle(event);
}

/// IP取得イベント（ルートノードのみ発生）
extern "C" fn ip_event_handler(
    _arg: *mut c_void,
    _event_base: sys::esp_event_base_t,
    _event_id: i32,
    event_data: *mut c_void,
) {
    if event_data.is_null() {
        return;
    }
    let event = unsafe { &*(event_data as *const sys::ip_event_got_ip_t) };
    let ip = Ipv4Addr::from(event.ip_info.ip.addr.to_le_bytes());
    info!("<IP_EVENT_STA_GOT_IP> IP:{}", ip);
}

/// 生のイベントIDとペイロードを `MeshEvent` に変換します
///
/// # Safety
///
/// `data` はイベントIDに対応する `mesh_event_*_t` を指しているか、null であること。
unsafe fn mesh_event_from_raw(event_id: i32, data: *const c_void) -> MeshEvent {
    // ペイロードを持つイベントで data が null の場合は Unknown として扱う
    macro_rules! payload {
        ($ty:ty) => {{
            if data.is_null() {
                return MeshEvent::Unknown { id: event_id };
            }
            &*(data as *const $ty)
        }};
    }

    let Ok(id) = u32::try_from(event_id) else {
        return MeshEvent::Unknown { id: event_id };
    };

    #[allow(non_upper_case_globals)]
    match id {
        sys::mesh_event_id_t_MESH_EVENT_STARTED => MeshEvent::Started,
        sys::mesh_event_id_t_MESH_EVENT_STOPPED => MeshEvent::Stopped,
        sys::mesh_event_id_t_MESH_EVENT_CHILD_CONNECTED => {
            let child = payload!(sys::mesh_event_child_connected_t);
            MeshEvent::ChildConnected {
                address: MacAddress::new(child.mac),
                aid: u16::from(child.aid),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_CHILD_DISCONNECTED => {
            let child = payload!(sys::mesh_event_child_disconnected_t);
            MeshEvent::ChildDisconnected {
                address: MacAddress::new(child.mac),
                aid: u16::from(child.aid),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROUTING_TABLE_ADD => {
            let change = payload!(sys::mesh_event_routing_table_change_t);
            MeshEvent::RoutingTableAdd {
                changed: change.rt_size_change,
                new_size: change.rt_size_new,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROUTING_TABLE_REMOVE => {
            let change = payload!(sys::mesh_event_routing_table_change_t);
            MeshEvent::RoutingTableRemove {
                changed: change.rt_size_change,
                new_size: change.rt_size_new,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_NO_PARENT_FOUND => {
            let no_parent = payload!(sys::mesh_event_no_parent_found_t);
            MeshEvent::NoParentFound {
                scan_times: no_parent.scan_times,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_PARENT_CONNECTED => {
            let connected = payload!(sys::mesh_event_connected_t);
            MeshEvent::ParentConnected {
                self_layer: connected.self_layer,
                bssid: MacAddress::new(connected.connected.bssid),
                duty: connected.duty,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_PARENT_DISCONNECTED => {
            let disconnected = payload!(sys::mesh_event_disconnected_t);
            MeshEvent::ParentDisconnected {
                reason: u16::from(disconnected.reason),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_LAYER_CHANGE => {
            let layer = payload!(sys::mesh_event_layer_change_t);
            MeshEvent::LayerChanged {
                new_layer: layer.new_layer,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_TODS_STATE => {
            let state = payload!(sys::mesh_event_toDS_state_t);
            MeshEvent::ToDsState {
                reachable: *state == sys::mesh_event_toDS_state_t_MESH_TODS_REACHABLE,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_VOTE_STARTED => {
            let vote = payload!(sys::mesh_event_vote_started_t);
            MeshEvent::VoteStarted {
                attempts: vote.attempts,
                reason: vote.reason as u32,
                candidate: MacAddress::new(vote.rc_addr.addr),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_VOTE_STOPPED => MeshEvent::VoteStopped,
        sys::mesh_event_id_t_MESH_EVENT_ROOT_ADDRESS => {
            let root = payload!(sys::mesh_event_root_address_t);
            MeshEvent::RootAddress {
                address: MacAddress::new(root.addr),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROOT_SWITCH_REQ => {
            let request = payload!(sys::mesh_event_root_switch_req_t);
            MeshEvent::RootSwitchRequest {
                reason: request.reason as u32,
                candidate: MacAddress::new(request.rc_addr.addr),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROOT_SWITCH_ACK => MeshEvent::RootSwitchAck,
        sys::mesh_event_id_t_MESH_EVENT_ROOT_ASKED_YIELD => {
            let conflict = payload!(sys::mesh_event_root_conflict_t);
            MeshEvent::RootAskedYield {
                address: MacAddress::new(conflict.addr),
                rssi: conflict.rssi as i32,
                capacity: conflict.capacity as i32,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROOT_FIXED => {
            let fixed = payload!(sys::mesh_event_root_fixed_t);
            MeshEvent::RootFixed {
                is_fixed: fixed.is_fixed,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_CHANNEL_SWITCH => {
            let switch = payload!(sys::mesh_event_channel_switch_t);
            MeshEvent::ChannelSwitch {
                channel: switch.channel,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_SCAN_DONE => {
            let scan = payload!(sys::mesh_event_scan_done_t);
            MeshEvent::ScanDone { count: scan.number }
        }
        sys::mesh_event_id_t_MESH_EVENT_NETWORK_STATE => {
            let state = payload!(sys::mesh_event_network_state_t);
            MeshEvent::NetworkState {
                is_rootless: state.is_rootless,
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_STOP_RECONNECTION => MeshEvent::StopReconnection,
        sys::mesh_event_id_t_MESH_EVENT_FIND_NETWORK => {
            let found = payload!(sys::mesh_event_find_network_t);
            MeshEvent::FindNetwork {
                channel: found.channel,
                router_bssid: MacAddress::new(found.router_bssid),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_ROUTER_SWITCH => {
            let router = payload!(sys::mesh_event_router_switch_t);
            let ssid_len = usize::from(router.ssid_len).min(router.ssid.len());
            MeshEvent::RouterSwitch {
                ssid: String::from_utf8_lossy(&router.ssid[..ssid_len]).into_owned(),
                channel: router.channel,
                bssid: MacAddress::new(router.bssid),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_PS_PARENT_DUTY => {
            let duty = payload!(sys::mesh_event_ps_duty_t);
            MeshEvent::PsParentDuty { duty: duty.duty }
        }
        sys::mesh_event_id_t_MESH_EVENT_PS_CHILD_DUTY => {
            let duty = payload!(sys::mesh_event_ps_duty_t);
            MeshEvent::PsChildDuty {
                duty: duty.duty,
                child: MacAddress::new(duty.child_connected.mac),
            }
        }
        sys::mesh_event_id_t_MESH_EVENT_PS_DEVICE_DUTY => {
            let duty = payload!(sys::mesh_event_ps_duty_t);
            MeshEvent::PsDeviceDuty { duty: duty.duty }
        }
        _ => MeshEvent::Unknown { id: event_id },
    }
}
