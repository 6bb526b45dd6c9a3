use std::time::Duration;

use crate::communication::mesh::MeshId;
use crate::core::config_validation::{
    check_motion_sensor_pin, clamp_mesh_ap_connections, clamp_mesh_max_layer, parse_frame_size,
    parse_jpeg_quality, parse_mesh_id, parse_p2p_interval_ms, parse_sd_bus_width,
    validate_max_len, validate_mount_point, validate_photo_file_name, validate_router_ssid,
    ValidationError, MAX_PASSWORD_LEN,
};
use crate::hardware::camera::FrameSize;
use crate::storage::{FormatPolicy, SdBusWidth};

/// アプリケーション設定
///
/// この構造体はビルド時に`cfg.toml`ファイルから読み込まれた設定を保持します。
#[cfg(feature = "esp")]
#[toml_cfg::toml_config]
pub struct Config {
    // メッシュネットワーク
    #[default(true)]
    mesh_enabled: bool,

    #[default("77:77:77:77:77:77")]
    mesh_id: &'static str,

    #[default(0)] // 0 はルーターのチャンネルに追従
    mesh_channel: u8,

    #[default("")]
    router_ssid: &'static str,

    #[default("")]
    router_password: &'static str,

    #[default("")]
    mesh_ap_password: &'static str,

    #[default(6)]
    mesh_ap_connections: u8,

    #[default(6)]
    mesh_max_layer: i32,

    // P2P送信
    #[default(5000)]
    p2p_interval_ms: u32,

    #[default(6144)]
    p2p_task_stack_size: u32,

    // カメラ
    #[default("QVGA")]
    frame_size: &'static str,

    #[default(12)]
    jpeg_quality: u8,

    #[default(3000)]
    camera_warmup_delay_ms: u32,

    #[default(100)]
    camera_warmup_frames: u32,

    // SDカード
    #[default("/sdcard")]
    sd_mount_point: &'static str,

    #[default(1)]
    sd_bus_width: u8,

    #[default(5)]
    sd_max_files: u8,

    #[default("picture.jpg")]
    photo_file_name: &'static str,

    #[default(false)] // 起動のたびにフォーマット（全データ消去）
    sd_format_on_boot: bool,

    #[default(false)]
    sd_format_if_unreadable: bool,

    // 人感センサー
    #[default(true)]
    motion_sensor_enabled: bool,

    #[default(false)]
    capture_on_motion: bool,

    #[default(1000)]
    motion_poll_ms: u32,

    #[default(0)] // 0 で定期撮影なし
    capture_interval_seconds: u32,
}

/// 設定ファイルの生の値（検証前）
///
/// `toml_cfg` の定数から作られます。ホストテストでは直接組み立てます。
#[derive(Debug, Clone)]
pub struct RawConfig<'a> {
    pub mesh_enabled: bool,
    pub mesh_id: &'a str,
    pub mesh_channel: u8,
    pub router_ssid: &'a str,
    pub router_password: &'a str,
    pub mesh_ap_password: &'a str,
    pub mesh_ap_connections: u8,
    pub mesh_max_layer: i32,
    pub p2p_interval_ms: u32,
    pub p2p_task_stack_size: u32,
    pub frame_size: &'a str,
    pub jpeg_quality: u8,
    pub camera_warmup_delay_ms: u32,
    pub camera_warmup_frames: u32,
    pub sd_mount_point: &'a str,
    pub sd_bus_width: u8,
    pub sd_max_files: u8,
    pub photo_file_name: &'a str,
    pub sd_format_on_boot: bool,
    pub sd_format_if_unreadable: bool,
    pub motion_sensor_enabled: bool,
    pub capture_on_motion: bool,
    pub motion_poll_ms: u32,
    pub capture_interval_seconds: u32,
}

impl Default for RawConfig<'static> {
    fn default() -> Self {
        Self {
            mesh_enabled: true,
            mesh_id: "77:77:77:77:77:77",
            mesh_channel: 0,
            router_ssid: "",
            router_password: "",
            mesh_ap_password: "",
            mesh_ap_connections: 6,
            mesh_max_layer: 6,
            p2p_interval_ms: 5000,
            p2p_task_stack_size: 6144,
            frame_size: "QVGA",
            jpeg_quality: 12,
            camera_warmup_delay_ms: 3000,
            camera_warmup_frames: 100,
            sd_mount_point: "/sdcard",
            sd_bus_width: 1,
            sd_max_files: 5,
            photo_file_name: "picture.jpg",
            sd_format_on_boot: false,
            sd_format_if_unreadable: false,
            motion_sensor_enabled: true,
            capture_on_motion: false,
            motion_poll_ms: 1000,
            capture_interval_seconds: 0,
        }
    }
}

/// 設定エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("無効なメッシュID: {0}")]
    InvalidMeshId(String),
    #[error("router_ssid が設定されていません。メッシュ有効時は必須です。cfg.tomlを確認してください。")]
    MissingRouterSsid,
    #[error("{field} が長すぎます (最大 {max} バイト)")]
    ValueTooLong { field: &'static str, max: usize },
    #[error("jpeg_quality の値が無効です (0-63): {0}")]
    InvalidJpegQuality(u8),
    #[error("未対応のフレームサイズ: {0}")]
    InvalidFrameSize(String),
    #[error("sd_bus_width の値が無効です (1 または 4): {0}")]
    InvalidSdBusWidth(u8),
    #[error("sd_mount_point が無効です: {0}")]
    InvalidMountPoint(String),
    #[error("photo_file_name が無効です: {0}")]
    InvalidPhotoFileName(String),
    #[error("人感センサー(GPIO12)はSDカード4ビットバスと同時に使用できません")]
    MotionSensorPinConflict,
    #[error("p2p_interval_ms の値が無効です: {0}")]
    InvalidP2pInterval(u32),
}

/// アプリケーション設定を表す構造体
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// メッシュネットワークを使用するか
    pub mesh_enabled: bool,

    /// メッシュID
    pub mesh_id: MeshId,

    /// メッシュチャンネル（0 = 自動）
    pub mesh_channel: u8,

    pub router_ssid: String,
    pub router_password: String,
    pub mesh_ap_password: String,

    /// メッシュAP最大接続数（1-10 にクランプ）
    pub mesh_ap_connections: u8,

    /// メッシュ最大レイヤー（1-25 にクランプ）
    pub mesh_max_layer: i32,

    /// P2P送信間隔
    pub p2p_interval: Duration,

    /// P2Pタスクのスタックサイズ（バイト）
    pub p2p_task_stack_size: usize,

    pub frame_size: FrameSize,
    pub jpeg_quality: u8,

    /// カメラ起動後の待機時間
    pub camera_warmup_delay: Duration,

    /// 撮影前に読み捨てるフレーム数
    pub camera_warmup_frames: u32,

    pub sd_mount_point: String,
    pub sd_bus_width: SdBusWidth,
    pub sd_max_files: usize,
    pub photo_file_name: String,

    /// マウント後のフォーマット条件
    pub sd_format: FormatPolicy,

    pub motion_sensor_enabled: bool,

    /// 人感センサー検知時に撮影するか（無効時はログのみ）
    pub capture_on_motion: bool,

    /// アイドルループの周期
    pub motion_poll: Duration,

    /// 定期撮影間隔。`None` なら起動時の1枚のみ
    pub capture_interval: Option<Duration>,
}

impl AppConfig {
    /// 設定ファイルから設定をロードします
    #[cfg(feature = "esp")]
    pub fn load() -> Result<Self, ConfigError> {
        // toml_cfg によって生成された定数
        let config = CONFIG;

        Self::from_raw(&RawConfig {
            mesh_enabled: config.mesh_enabled,
            mesh_id: config.mesh_id,
            mesh_channel: config.mesh_channel,
            router_ssid: config.router_ssid,
            router_password: config.router_password,
            mesh_ap_password: config.mesh_ap_password,
            mesh_ap_connections: config.mesh_ap_connections,
            mesh_max_layer: config.mesh_max_layer,
            p2p_interval_ms: config.p2p_interval_ms,
            p2p_task_stack_size: config.p2p_task_stack_size,
            frame_size: config.frame_size,
            jpeg_quality: config.jpeg_quality,
            camera_warmup_delay_ms: config.camera_warmup_delay_ms,
            camera_warmup_frames: config.camera_warmup_frames,
            sd_mount_point: config.sd_mount_point,
            sd_bus_width: config.sd_bus_width,
            sd_max_files: config.sd_max_files,
            photo_file_name: config.photo_file_name,
            sd_format_on_boot: config.sd_format_on_boot,
            sd_format_if_unreadable: config.sd_format_if_unreadable,
            motion_sensor_enabled: config.motion_sensor_enabled,
            capture_on_motion: config.capture_on_motion,
            motion_poll_ms: config.motion_poll_ms,
            capture_interval_seconds: config.capture_interval_seconds,
        })
    }

    /// 生の設定値を検証して `AppConfig` を作成します
    pub fn from_raw(raw: &RawConfig<'_>) -> Result<Self, ConfigError> {
        // メッシュ設定
        let mesh_id = parse_mesh_id(raw.mesh_id).map_err(map_validation_error)?;
        validate_router_ssid(raw.router_ssid, raw.mesh_enabled).map_err(map_validation_error)?;
        validate_max_len("router_password", raw.router_password, MAX_PASSWORD_LEN)
            .map_err(map_validation_error)?;
        validate_max_len("mesh_ap_password", raw.mesh_ap_password, MAX_PASSWORD_LEN)
            .map_err(map_validation_error)?;
        let mesh_ap_connections = clamp_mesh_ap_connections(raw.mesh_ap_connections);
        let mesh_max_layer = clamp_mesh_max_layer(raw.mesh_max_layer);

        // P2P送信設定
        let p2p_interval_ms = parse_p2p_interval_ms(raw.p2p_interval_ms).map_err(map_validation_error)?;

        // カメラ設定
        let frame_size = parse_frame_size(raw.frame_size).map_err(map_validation_error)?;
        let jpeg_quality = parse_jpeg_quality(raw.jpeg_quality).map_err(map_validation_error)?;

        // SDカード設定
        validate_mount_point(raw.sd_mount_point).map_err(map_validation_error)?;
        let sd_bus_width = parse_sd_bus_width(raw.sd_bus_width).map_err(map_validation_error)?;
        validate_photo_file_name(raw.photo_file_name).map_err(map_validation_error)?;
        check_motion_sensor_pin(raw.motion_sensor_enabled, sd_bus_width)
            .map_err(map_validation_error)?;

        let capture_interval = match raw.capture_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        };

        Ok(AppConfig {
            mesh_enabled: raw.mesh_enabled,
            mesh_id,
            mesh_channel: raw.mesh_channel,
            router_ssid: raw.router_ssid.to_string(),
            router_password: raw.router_password.to_string(),
            mesh_ap_password: raw.mesh_ap_password.to_string(),
            mesh_ap_connections,
            mesh_max_layer,
            p2p_interval: Duration::from_millis(u64::from(p2p_interval_ms)),
            p2p_task_stack_size: raw.p2p_task_stack_size as usize,
            frame_size,
            jpeg_quality,
            camera_warmup_delay: Duration::from_millis(u64::from(raw.camera_warmup_delay_ms)),
            camera_warmup_frames: raw.camera_warmup_frames,
            sd_mount_point: raw.sd_mount_point.to_string(),
            sd_bus_width,
            sd_max_files: usize::from(raw.sd_max_files.max(1)),
            photo_file_name: raw.photo_file_name.to_string(),
            sd_format: FormatPolicy {
                on_boot: raw.sd_format_on_boot,
                if_unreadable: raw.sd_format_if_unreadable,
            },
            motion_sensor_enabled: raw.motion_sensor_enabled,
            capture_on_motion: raw.capture_on_motion,
            motion_poll: Duration::from_millis(u64::from(raw.motion_poll_ms.max(10))),
            capture_interval,
        })
    }
}

fn map_validation_error(err: ValidationError) -> ConfigError {
    match err {
        ValidationError::MissingMeshId => ConfigError::InvalidMeshId(
            "メッシュIDが設定されていません。cfg.tomlを確認してください。".to_string(),
        ),
        ValidationError::InvalidMeshId(v) => ConfigError::InvalidMeshId(v),
        ValidationError::MissingRouterSsid => ConfigError::MissingRouterSsid,
        ValidationError::ValueTooLong { field, max } => ConfigError::ValueTooLong { field, max },
        ValidationError::InvalidJpegQuality(v) => ConfigError::InvalidJpegQuality(v),
        ValidationError::InvalidFrameSize(v) => ConfigError::InvalidFrameSize(v),
        ValidationError::InvalidSdBusWidth(v) => ConfigError::InvalidSdBusWidth(v),
        ValidationError::InvalidMountPoint(v) => ConfigError::InvalidMountPoint(v),
        ValidationError::InvalidPhotoFileName(v) => ConfigError::InvalidPhotoFileName(v),
        ValidationError::MotionSensorPinConflict => ConfigError::MotionSensorPinConflict,
        ValidationError::InvalidP2pInterval(v) => ConfigError::InvalidP2pInterval(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawConfig<'static> {
        RawConfig {
            router_ssid: "farm-router",
            ..RawConfig::default()
        }
    }

    #[test]
    fn defaults_produce_valid_config() {
        let config = AppConfig::from_raw(&raw()).unwrap();
        assert_eq!(config.mesh_id, MeshId([0x77; 6]));
        assert_eq!(config.p2p_interval, Duration::from_secs(5));
        assert_eq!(config.frame_size, FrameSize::Qvga);
        assert_eq!(config.sd_bus_width, SdBusWidth::One);
        assert_eq!(config.sd_max_files, 5);
        assert_eq!(config.camera_warmup_frames, 100);
        assert_eq!(config.capture_interval, None);
        assert!(!config.capture_on_motion);
        assert_eq!(config.sd_format, FormatPolicy::default());
    }

    #[test]
    fn sd_format_keys_map_to_policy() {
        let config = AppConfig::from_raw(&RawConfig {
            sd_format_if_unreadable: true,
            ..raw()
        })
        .unwrap();
        assert!(!config.sd_format.on_boot);
        assert!(config.sd_format.needs_format(false));
        assert!(!config.sd_format.needs_format(true));

        let config = AppConfig::from_raw(&RawConfig {
            sd_format_on_boot: true,
            ..raw()
        })
        .unwrap();
        assert!(config.sd_format.needs_format(true));
    }

    #[test]
    fn mesh_disabled_does_not_need_router() {
        let config = AppConfig::from_raw(&RawConfig {
            mesh_enabled: false,
            ..RawConfig::default()
        });
        assert!(config.is_ok());

        let err = AppConfig::from_raw(&RawConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingRouterSsid);
    }

    #[test]
    fn four_bit_bus_with_motion_sensor_is_rejected() {
        let err = AppConfig::from_raw(&RawConfig {
            sd_bus_width: 4,
            ..raw()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::MotionSensorPinConflict);

        let config = AppConfig::from_raw(&RawConfig {
            sd_bus_width: 4,
            motion_sensor_enabled: false,
            ..raw()
        })
        .unwrap();
        assert_eq!(config.sd_bus_width, SdBusWidth::Four);
    }

    #[test]
    fn out_of_range_mesh_limits_are_clamped() {
        let config = AppConfig::from_raw(&RawConfig {
            mesh_max_layer: 40,
            mesh_ap_connections: 0,
            ..raw()
        })
        .unwrap();
        assert_eq!(config.mesh_max_layer, 25);
        assert_eq!(config.mesh_ap_connections, 1);
    }

    #[test]
    fn capture_interval_zero_disables_periodic_capture() {
        let config = AppConfig::from_raw(&RawConfig {
            capture_interval_seconds: 30,
            ..raw()
        })
        .unwrap();
        assert_eq!(config.capture_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn invalid_values_map_to_config_errors() {
        assert_eq!(
            AppConfig::from_raw(&RawConfig { mesh_id: "", ..raw() }).unwrap_err(),
            ConfigError::InvalidMeshId(
                "メッシュIDが設定されていません。cfg.tomlを確認してください。".to_string()
            )
        );
        assert_eq!(
            AppConfig::from_raw(&RawConfig { jpeg_quality: 70, ..raw() }).unwrap_err(),
            ConfigError::InvalidJpegQuality(70)
        );
        assert_eq!(
            AppConfig::from_raw(&RawConfig { sd_mount_point: "sdcard", ..raw() }).unwrap_err(),
            ConfigError::InvalidMountPoint("sdcard".to_string())
        );
    }
}
