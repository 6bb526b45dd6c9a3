use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{self, esp};
use esp_idf_svc::wifi::WifiDriver;
use log::{info, warn};

use crate::communication::mesh::EspStaDhcp;
use crate::core::config::AppConfig;

/// 起動済みWiFiドライバとメッシュ用ネットワークインターフェース
///
/// ドライバはメッシュ稼働中は保持し続ける必要があります。
pub struct MeshHandles {
    _driver: WifiDriver<'static>,
    sta_netif: *mut sys::esp_netif_t,
}

impl MeshHandles {
    /// ルートノード用のDHCPクライアント（メッシュSTAインターフェース）
    pub fn sta_dhcp(&self) -> EspStaDhcp {
        // sta_netif はプロセス終了まで破棄しない
        unsafe { EspStaDhcp::new(self.sta_netif) }
    }
}

/// WiFiとESP-WIFI-MESHの初期化を管理するモジュール
pub struct NetworkManager;

impl NetworkManager {
    /// WiFiをメッシュ用に準備します（STA/APのメッシュ用netifを作成してWiFiを起動）
    ///
    /// イベントハンドラ登録の後に `start_mesh` を呼んでください。
    pub fn prepare_wifi_for_mesh(
        modem: Modem,
        sysloop: &EspSystemEventLoop,
        nvs_partition: &EspDefaultNvsPartition,
    ) -> anyhow::Result<MeshHandles> {
        info!("メッシュ用にWiFiを準備します。");

        unsafe {
            esp!(sys::esp_netif_init())?;
        }

        let mut driver = WifiDriver::new(modem, sysloop.clone(), Some(nvs_partition.clone()))?;

        let mut sta_netif: *mut sys::esp_netif_t = std::ptr::null_mut();
        unsafe {
            esp!(sys::esp_netif_create_default_wifi_mesh_netifs(
                &mut sta_netif,
                std::ptr::null_mut(),
            ))?;
        }
        if sta_netif.is_null() {
            anyhow::bail!("メッシュSTAインターフェースの作成に失敗しました");
        }

        driver.start()?;
        info!("WiFiがメッシュ用に起動しました。");

        // メッシュはパケット中継のため省電力を無効にする
        unsafe {
            let err = sys::esp_wifi_set_ps(sys::wifi_ps_type_t_WIFI_PS_NONE);
            if err != sys::ESP_OK {
                warn!("Wi-Fi Power Save の無効化に失敗 (code: {:#x})", err);
            }
        }

        Ok(MeshHandles {
            _driver: driver,
            sta_netif,
        })
    }

    /// メッシュを設定して開始します
    pub fn start_mesh(config: &AppConfig) -> anyhow::Result<()> {
        info!(
            "メッシュを開始します: ID={}, channel={}, router={}",
            config.mesh_id, config.mesh_channel, config.router_ssid
        );

        let mut router_ssid = [0u8; 32];
        let ssid_len = copy_truncated(&mut router_ssid, &config.router_ssid);
        let mut router_password = [0u8; 64];
        copy_truncated(&mut router_password, &config.router_password);
        let mut ap_password = [0u8; 64];
        copy_truncated(&mut ap_password, &config.mesh_ap_password);

        let mesh_cfg = sys::mesh_cfg_t {
            channel: config.mesh_channel,
            allow_channel_switch: config.mesh_channel == 0,
            mesh_id: sys::mesh_addr_t {
                addr: config.mesh_id.0,
            },
            router: sys::mesh_router_t {
                ssid: router_ssid,
                ssid_len: ssid_len as u8,
                bssid: [0u8; 6],
                password: router_password,
                allow_router_switch: false,
            },
            mesh_ap: sys::mesh_ap_cfg_t {
                password: ap_password,
                max_connection: config.mesh_ap_connections,
                nonmesh_max_connection: 0,
            },
            crypto_funcs: std::ptr::null(),
        };

        let authmode = if config.mesh_ap_password.is_empty() {
            sys::wifi_auth_mode_t_WIFI_AUTH_OPEN
        } else {
            sys::wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK
        };

        unsafe {
            esp!(sys::esp_mesh_init())?;
            esp!(sys::esp_mesh_set_topology(sys::esp_mesh_topology_t_MESH_TOPO_TREE))?;
            esp!(sys::esp_mesh_set_max_layer(config.mesh_max_layer))?;
            esp!(sys::esp_mesh_set_vote_percentage(1.0))?;
            esp!(sys::esp_mesh_set_xon_qsize(128))?;
            esp!(sys::esp_mesh_set_ap_assoc_expire(10))?;
            esp!(sys::esp_mesh_set_ap_authmode(authmode))?;
            esp!(sys::esp_mesh_set_config(&mesh_cfg))?;
            esp!(sys::esp_mesh_start())?;
        }

        info!(
            "メッシュを開始しました: 最大レイヤー {}, AP接続数 {}, 空きヒープ {} bytes",
            config.mesh_max_layer,
            config.mesh_ap_connections,
            unsafe { sys::esp_get_free_heap_size() }
        );
        Ok(())
    }
}

fn copy_truncated(dest: &mut [u8], value: &str) -> usize {
    let len = value.len().min(dest.len());
    dest[..len].copy_from_slice(&value.as_bytes()[..len]);
    len
}
