use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{Gpio33, Output, PinDriver};

use crate::hardware::led::LedError;

/// 点滅パターン（回数, 点灯ms, 消灯ms）
const ERROR_PATTERN: (u32, u32, u32) = (3, 300, 300);
const SUCCESS_PATTERN: (u32, u32, u32) = (2, 100, 100);

/// ESP32-CAM 基板裏の赤色LED（GPIO33）
///
/// アクティブローのため、点灯はLOW出力です。
pub struct StatusLed {
    pin: PinDriver<'static, Gpio33, Output>,
}

impl StatusLed {
    /// 消灯状態で初期化します
    pub fn new(pin: Gpio33) -> Result<Self, LedError> {
        let pin = PinDriver::output(pin).map_err(|e| LedError::InitFailed(format!("{:?}", e)))?;
        let mut led = Self { pin };
        led.turn_off()?;
        Ok(led)
    }

    pub fn turn_on(&mut self) -> Result<(), LedError> {
        self.set_lit(true)
    }

    pub fn turn_off(&mut self) -> Result<(), LedError> {
        self.set_lit(false)
    }

    /// 長めの点滅3回（初期化・撮影失敗）
    pub fn blink_error(&mut self) -> Result<(), LedError> {
        self.blink(ERROR_PATTERN)
    }

    /// 短い点滅2回（保存成功）
    pub fn blink_success(&mut self) -> Result<(), LedError> {
        self.blink(SUCCESS_PATTERN)
    }

    /// 撮影中は点灯したままにする。完了後は点滅パターンで消灯状態に戻る
    pub fn indicate_capturing(&mut self) -> Result<(), LedError> {
        self.turn_on()
    }

    fn blink(&mut self, (times, on_ms, off_ms): (u32, u32, u32)) -> Result<(), LedError> {
        for _ in 0..times {
            self.set_lit(true)?;
            FreeRtos::delay_ms(on_ms);
            self.set_lit(false)?;
            FreeRtos::delay_ms(off_ms);
        }
        Ok(())
    }

    fn set_lit(&mut self, lit: bool) -> Result<(), LedError> {
        let result = if lit {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        result.map_err(|e| LedError::ControlFailed(format!("{:?}", e)))
    }
}
