use esp_idf_svc::hal::gpio::{Gpio12, Input, InterruptType, PinDriver, Pull};
use esp_idf_svc::sys::EspError;
use log::{info, warn};

use crate::core::motion::{MotionFlag, MotionInput};

/// 人感センサー（PIR、GPIO12、立ち上がりエッジ割り込み）
pub struct PirSensor {
    pin: PinDriver<'static, Gpio12, Input>,
    flag: MotionFlag,
}

impl PirSensor {
    /// GPIO12 をプルダウン入力に設定し、立ち上がりエッジで `flag` を立てる割り込みを登録します
    pub fn new(pin: Gpio12, flag: MotionFlag) -> Result<Self, EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Down)?;
        pin.set_interrupt_type(InterruptType::PosEdge)?;

        let isr_flag = flag.clone();
        // ISR内ではアトミック操作のみ行う
        unsafe {
            pin.subscribe(move || isr_flag.trigger())?;
        }
        pin.enable_interrupt()?;
        info!("人感センサー割り込みを設定しました (GPIO12, 立ち上がりエッジ)");

        Ok(Self { pin, flag })
    }

    pub fn flag(&self) -> &MotionFlag {
        &self.flag
    }
}

impl MotionInput for PirSensor {
    fn take_motion(&mut self) -> bool {
        let detected = self.flag.take();
        if detected {
            // esp-idf-hal は通知ごとに割り込みを無効化するため再度有効化する
            if let Err(e) = self.pin.enable_interrupt() {
                warn!("人感センサー割り込みの再有効化に失敗: {:?}", e);
            }
        }
        detected
    }
}
