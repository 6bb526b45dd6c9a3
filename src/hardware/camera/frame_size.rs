/// カメラのフレームサイズ（esp32-camera の framesize_t に対応する範囲のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    Qqvga, // 160x120
    Qvga,  // 320x240
    Cif,   // 400x296
    Vga,   // 640x480
    Svga,  // 800x600
    Xga,   // 1024x768
    Sxga,  // 1280x1024
    Uxga,  // 1600x1200
}

impl FrameSize {
    /// 設定文字列（"QVGA" など、大文字小文字は区別しない）から変換
    pub fn parse(name: &str) -> Option<Self> {
        let size = match name.trim().to_ascii_uppercase().as_str() {
            "QQVGA" => FrameSize::Qqvga,
            "QVGA" => FrameSize::Qvga,
            "CIF" => FrameSize::Cif,
            "VGA" => FrameSize::Vga,
            "SVGA" => FrameSize::Svga,
            "XGA" => FrameSize::Xga,
            "SXGA" => FrameSize::Sxga,
            "UXGA" => FrameSize::Uxga,
            _ => return None,
        };
        Some(size)
    }

    /// 幅と高さ（ピクセル）
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }

    /// esp32-camera の framesize_t 値
    #[cfg(feature = "esp")]
    pub fn to_framesize(self) -> esp_idf_sys::camera::framesize_t {
        use esp_idf_sys::camera::*;
        match self {
            FrameSize::Qqvga => framesize_t_FRAMESIZE_QQVGA,
            FrameSize::Qvga => framesize_t_FRAMESIZE_QVGA,
            FrameSize::Cif => framesize_t_FRAMESIZE_CIF,
            FrameSize::Vga => framesize_t_FRAMESIZE_VGA,
            FrameSize::Svga => framesize_t_FRAMESIZE_SVGA,
            FrameSize::Xga => framesize_t_FRAMESIZE_XGA,
            FrameSize::Sxga => framesize_t_FRAMESIZE_SXGA,
            FrameSize::Uxga => framesize_t_FRAMESIZE_UXGA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!(FrameSize::parse("qvga"), Some(FrameSize::Qvga));
        assert_eq!(FrameSize::parse(" UXGA "), Some(FrameSize::Uxga));
        assert_eq!(FrameSize::parse("HD"), None);
    }

    #[test]
    fn dimensions_match_sensor_modes() {
        assert_eq!(FrameSize::Qvga.dimensions(), (320, 240));
        assert_eq!(FrameSize::Svga.dimensions(), (800, 600));
    }
}
