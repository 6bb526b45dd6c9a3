use std::str::FromStr;

use crate::communication::mesh::MeshId;
use crate::hardware::camera::FrameSize;
use crate::mac_address::MacAddress;
use crate::storage::SdBusWidth;

/// ルーターSSIDの最大長（mesh_router_t.ssid）
pub const MAX_SSID_LEN: usize = 32;
/// パスワードの最大長（mesh_router_t.password / mesh_ap_cfg_t.password）
pub const MAX_PASSWORD_LEN: usize = 64;
/// esp-mesh が許容する最大レイヤー数
pub const MESH_LAYER_LIMIT: i32 = 25;
/// メッシュAPの最大接続数
pub const MESH_AP_CONNECTION_LIMIT: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingMeshId,
    InvalidMeshId(String),
    MissingRouterSsid,
    ValueTooLong { field: &'static str, max: usize },
    InvalidJpegQuality(u8),
    InvalidFrameSize(String),
    InvalidSdBusWidth(u8),
    InvalidMountPoint(String),
    InvalidPhotoFileName(String),
    MotionSensorPinConflict,
    InvalidP2pInterval(u32),
}

pub fn parse_mesh_id(mesh_id: &str) -> Result<MeshId, ValidationError> {
    if mesh_id.trim().is_empty() {
        return Err(ValidationError::MissingMeshId);
    }

    MacAddress::from_str(mesh_id.trim())
        .map(|mac| MeshId(mac.octets()))
        .map_err(|_| ValidationError::InvalidMeshId(mesh_id.to_string()))
}

/// メッシュ有効時はルーターSSIDが必須（ルートノードが上流へ接続するため）
pub fn validate_router_ssid(ssid: &str, mesh_enabled: bool) -> Result<(), ValidationError> {
    if !mesh_enabled {
        return Ok(());
    }
    if ssid.is_empty() {
        return Err(ValidationError::MissingRouterSsid);
    }
    validate_max_len("router_ssid", ssid, MAX_SSID_LEN)
}

pub fn validate_max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        Err(ValidationError::ValueTooLong { field, max })
    } else {
        Ok(())
    }
}

/// JPEG品質（0が最高画質、63が最低画質）
pub fn parse_jpeg_quality(value: u8) -> Result<u8, ValidationError> {
    if value <= 63 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidJpegQuality(value))
    }
}

pub fn parse_frame_size(value: &str) -> Result<FrameSize, ValidationError> {
    FrameSize::parse(value).ok_or_else(|| ValidationError::InvalidFrameSize(value.to_string()))
}

pub fn parse_sd_bus_width(value: u8) -> Result<SdBusWidth, ValidationError> {
    match value {
        1 => Ok(SdBusWidth::One),
        4 => Ok(SdBusWidth::Four),
        other => Err(ValidationError::InvalidSdBusWidth(other)),
    }
}

pub fn validate_mount_point(value: &str) -> Result<(), ValidationError> {
    if value.len() > 1 && value.starts_with('/') && !value.ends_with('/') {
        Ok(())
    } else {
        Err(ValidationError::InvalidMountPoint(value.to_string()))
    }
}

/// 保存ファイル名（マウントポイント直下、サブディレクトリ不可）
pub fn validate_photo_file_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.contains('/') || value == "." || value == ".." {
        Err(ValidationError::InvalidPhotoFileName(value.to_string()))
    } else {
        Ok(())
    }
}

/// 人感センサー(GPIO12)は4ビットバスのD2と共用のため同時使用不可
pub fn check_motion_sensor_pin(
    motion_sensor_enabled: bool,
    bus_width: SdBusWidth,
) -> Result<(), ValidationError> {
    if motion_sensor_enabled && bus_width == SdBusWidth::Four {
        Err(ValidationError::MotionSensorPinConflict)
    } else {
        Ok(())
    }
}

pub fn parse_p2p_interval_ms(value: u32) -> Result<u32, ValidationError> {
    if value == 0 {
        Err(ValidationError::InvalidP2pInterval(value))
    } else {
        Ok(value)
    }
}

pub fn clamp_mesh_max_layer(value: i32) -> i32 {
    value.clamp(1, MESH_LAYER_LIMIT)
}

pub fn clamp_mesh_ap_connections(value: u8) -> u8 {
    value.clamp(1, MESH_AP_CONNECTION_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_id_parses_colon_separated_hex() {
        assert_eq!(parse_mesh_id("77:77:77:77:77:77"), Ok(MeshId([0x77; 6])));
        assert_eq!(parse_mesh_id(""), Err(ValidationError::MissingMeshId));
        assert!(matches!(
            parse_mesh_id("77:77:77"),
            Err(ValidationError::InvalidMeshId(_))
        ));
    }

    #[test]
    fn router_ssid_required_only_with_mesh() {
        assert_eq!(
            validate_router_ssid("", true),
            Err(ValidationError::MissingRouterSsid)
        );
        assert_eq!(validate_router_ssid("", false), Ok(()));
        assert_eq!(validate_router_ssid("farm-ap", true), Ok(()));
        assert_eq!(
            validate_router_ssid(&"a".repeat(33), true),
            Err(ValidationError::ValueTooLong {
                field: "router_ssid",
                max: MAX_SSID_LEN
            })
        );
    }

    #[test]
    fn jpeg_quality_range() {
        assert_eq!(parse_jpeg_quality(0), Ok(0));
        assert_eq!(parse_jpeg_quality(63), Ok(63));
        assert_eq!(parse_jpeg_quality(64), Err(ValidationError::InvalidJpegQuality(64)));
    }

    #[test]
    fn bus_width_is_one_or_four() {
        assert_eq!(parse_sd_bus_width(1), Ok(SdBusWidth::One));
        assert_eq!(parse_sd_bus_width(4), Ok(SdBusWidth::Four));
        assert_eq!(parse_sd_bus_width(2), Err(ValidationError::InvalidSdBusWidth(2)));
    }

    #[test]
    fn motion_sensor_conflicts_with_four_bit_bus() {
        assert_eq!(
            check_motion_sensor_pin(true, SdBusWidth::Four),
            Err(ValidationError::MotionSensorPinConflict)
        );
        assert_eq!(check_motion_sensor_pin(false, SdBusWidth::Four), Ok(()));
        assert_eq!(check_motion_sensor_pin(true, SdBusWidth::One), Ok(()));
    }

    #[test]
    fn mount_point_and_file_name() {
        assert_eq!(validate_mount_point("/sdcard"), Ok(()));
        assert!(validate_mount_point("sdcard").is_err());
        assert!(validate_mount_point("/").is_err());
        assert!(validate_mount_point("/sdcard/").is_err());

        assert_eq!(validate_photo_file_name("picture.jpg"), Ok(()));
        assert!(validate_photo_file_name("").is_err());
        assert!(validate_photo_file_name("img/picture.jpg").is_err());
    }

    #[test]
    fn frame_size_and_interval() {
        assert_eq!(parse_frame_size("vga"), Ok(FrameSize::Vga));
        assert!(parse_frame_size("4K").is_err());
        assert_eq!(parse_p2p_interval_ms(5000), Ok(5000));
        assert_eq!(parse_p2p_interval_ms(0), Err(ValidationError::InvalidP2pInterval(0)));
    }

    #[test]
    fn clamps_mesh_limits() {
        assert_eq!(clamp_mesh_max_layer(0), 1);
        assert_eq!(clamp_mesh_max_layer(6), 6);
        assert_eq!(clamp_mesh_max_layer(99), MESH_LAYER_LIMIT);
        assert_eq!(clamp_mesh_ap_connections(0), 1);
        assert_eq!(clamp_mesh_ap_connections(20), MESH_AP_CONNECTION_LIMIT);
    }
}
