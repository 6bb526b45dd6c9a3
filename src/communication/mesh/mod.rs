/// メッシュライフサイクルイベント
pub mod event;
/// ESP-WIFI-MESH 実装（実機のみ）
#[cfg(feature = "esp")]
pub mod esp_mesh;

pub use event::MeshEvent;
#[cfg(feature = "esp")]
pub use esp_mesh::{register_event_handlers, EspMemoryProbe, EspMesh, EspStaDhcp};

use crate::mac_address::MacAddress;
use std::fmt;
use std::time::Duration;

/// 未接続を表すメッシュレイヤー
pub const UNCONNECTED_LAYER: i32 = -1;

/// メッシュ1パケットの最大ペイロード（MESH_MPS）
pub const MESH_MAX_PAYLOAD: usize = 1460;

/// メッシュネットワーク識別子（起動時に一度だけ設定される6バイト）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshId(pub [u8; 6]);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        MacAddress::new(self.0).fmt(f)
    }
}

/// 送信フラグ（MESH_DATA_* に対応）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFlags(pub u32);

impl SendFlags {
    /// ノード宛の1対1送信 (MESH_DATA_P2P)
    pub const P2P: SendFlags = SendFlags(0x02);
}

/// 受信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub from: MacAddress,
    pub len: usize,
}

/// メッシュ通信エラー（ESP-IDFのエラーコードを保持）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("メッシュ送信エラー (code: {code})")]
    Send { code: i32 },

    #[error("メッシュ受信エラー (code: {code})")]
    Receive { code: i32 },

    #[error("メッシュ受信タイムアウト")]
    Timeout,

    #[error("DHCPクライアント操作エラー (code: {code})")]
    Dhcp { code: i32 },
}

impl MeshError {
    /// ログ出力用のエラーコード
    pub fn code(&self) -> i32 {
        match self {
            MeshError::Send { code }
            | MeshError::Receive { code }
            | MeshError::Dhcp { code } => *code,
            MeshError::Timeout => 0x107, // ESP_ERR_TIMEOUT
        }
    }
}

/// メッシュネットワーク機能（ベンダースタックのラッパー）
///
/// 実機では `EspMesh`、テストではモックを使用します。
pub trait MeshNetwork: Send + Sync {
    /// 自ノードの現在のレイヤー（未接続なら -1）
    fn self_layer(&self) -> i32;

    /// 現在の親ノードのBSSID
    fn parent_address(&self) -> MacAddress;

    /// 自ノードがルートかどうか
    fn is_root(&self) -> bool;

    /// ルーティングテーブルのサイズ
    fn routing_table_size(&self) -> usize;

    /// 自ノードのSTA MACアドレス
    fn self_address(&self) -> MacAddress;

    /// 指定ノードへ送信
    fn send(&self, to: &MacAddress, payload: &[u8], flags: SendFlags) -> Result<(), MeshError>;

    /// 受信（タイムアウト付き）。受信データは `buf` の先頭に書き込まれる
    fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Received, MeshError>;
}

/// 上流側IP設定（ルートノードのみ使用）
pub trait DhcpClient: Send + Sync {
    fn stop(&self) -> Result<(), MeshError>;
    fn start(&self) -> Result<(), MeshError>;
}

/// 空きヒープ量の取得
pub trait MemoryProbe: Send + Sync {
    fn free_heap_bytes(&self) -> u32;
}
