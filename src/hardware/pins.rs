use esp_idf_svc::hal::gpio::*;

/// カメラピン設定構造体（ESP32-CAM AI-Thinker）
///
/// PWDN は GPIO32、RESET はソフトウェアリセットのため未接続。
pub struct CameraPins {
    pub pwdn: Gpio32,
    pub clock: Gpio0,
    pub d0: Gpio5,
    pub d1: Gpio18,
    pub d2: Gpio19,
    pub d3: Gpio21,
    pub d4: Gpio36,
    pub d5: Gpio39,
    pub d6: Gpio34,
    pub d7: Gpio35,
    pub vsync: Gpio25,
    pub href: Gpio23,
    pub pclk: Gpio22,
    pub sda: Gpio26,
    pub scl: Gpio27,
}

impl CameraPins {
    /// 個別のピンから作成
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pwdn: Gpio32, clock: Gpio0, d0: Gpio5, d1: Gpio18, d2: Gpio19,
        d3: Gpio21, d4: Gpio36, d5: Gpio39, d6: Gpio34, d7: Gpio35,
        vsync: Gpio25, href: Gpio23, pclk: Gpio22, sda: Gpio26, scl: Gpio27,
    ) -> Self {
        Self {
            pwdn, clock, d0, d1, d2, d3, d4, d5, d6, d7,
            vsync, href, pclk, sda, scl,
        }
    }
}

