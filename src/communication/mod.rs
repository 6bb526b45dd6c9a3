/// メッシュネットワーク抽象とESP-WIFI-MESH実装
pub mod mesh;
/// 親ノードとのP2P送受信タスク
pub mod p2p;
#[cfg(feature = "esp")]
pub mod network_manager;

#[cfg(feature = "esp")]
pub use network_manager::{MeshHandles, NetworkManager};
