use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{Gpio32, Output, PinDriver};
use log::{debug, info, warn};

use crate::hardware::camera::{CameraError, FrameSize, FrameSource};
use crate::hardware::CameraPins;

/// カメラ制御（esp32-camera / OV2640）
///
/// 生成時に PWDN(GPIO32) を LOW にして電源を入れ、センサーを初期化します。
/// PWDN ドライバはカメラと同じ期間保持します。
pub struct CameraController<'d> {
    camera: esp_camera_rs::Camera<'d>,
    _power: PinDriver<'d, Gpio32, Output>,
    frame_size: FrameSize,
}

impl<'d> CameraController<'d> {
    /// 新しいカメラコントローラーを作成します
    ///
    /// # 引数
    ///
    /// * `pins` - AI-Thinker のカメラピン
    /// * `frame_size` - 撮影フレームサイズ
    /// * `jpeg_quality` - JPEG品質 (0-63、小さいほど高画質)
    pub fn new(
        pins: &'d mut CameraPins,
        frame_size: FrameSize,
        jpeg_quality: u8,
    ) -> Result<Self, CameraError> {
        let mut power = PinDriver::output(&mut pins.pwdn)
            .map_err(|e| CameraError::PowerPinFailed(format!("{:?}", e)))?;
        power
            .set_low()
            .map_err(|e| CameraError::PowerPinFailed(format!("{:?}", e)))?;
        // 電源投入後のセンサー安定待ち
        FreeRtos::delay_ms(10);

        let camera_params = esp_camera_rs::CameraParams::new()
            .set_clock_pin(&mut pins.clock)
            .set_d0_pin(&mut pins.d0)
            .set_d1_pin(&mut pins.d1)
            .set_d2_pin(&mut pins.d2)
            .set_d3_pin(&mut pins.d3)
            .set_d4_pin(&mut pins.d4)
            .set_d5_pin(&mut pins.d5)
            .set_d6_pin(&mut pins.d6)
            .set_d7_pin(&mut pins.d7)
            .set_vertical_sync_pin(&mut pins.vsync)
            .set_horizontal_reference_pin(&mut pins.href)
            .set_pixel_clock_pin(&mut pins.pclk)
            .set_sda_pin(&mut pins.sda)
            .set_scl_pin(&mut pins.scl);

        let camera = esp_camera_rs::Camera::new(&camera_params)
            .map_err(|e| CameraError::InitFailed(format!("{:?}", e)))?;

        let sensor = camera.sensor();
        sensor
            .set_framesize(frame_size.to_framesize())
            .map_err(|e| CameraError::SensorConfigFailed(format!("framesize: {:?}", e)))?;
        sensor
            .set_quality(i32::from(jpeg_quality))
            .map_err(|e| CameraError::SensorConfigFailed(format!("quality: {:?}", e)))?;

        let (width, height) = frame_size.dimensions();
        info!(
            "カメラを初期化しました: {:?} ({}x{}), JPEG品質 {}",
            frame_size, width, height, jpeg_quality
        );

        Ok(Self {
            camera,
            _power: power,
            frame_size,
        })
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }
}

impl FrameSource for CameraController<'_> {
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        match self.camera.get_framebuffer() {
            Some(framebuffer) => {
                let data = framebuffer.data().to_vec();
                debug!(
                    "撮影完了: {}x{} {} bytes",
                    framebuffer.width(),
                    framebuffer.height(),
                    data.len()
                );
                Ok(data)
            }
            None => {
                warn!("フレームバッファの取得に失敗しました");
                Err(CameraError::CaptureFailed)
            }
        }
    }
}
