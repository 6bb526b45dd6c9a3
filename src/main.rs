use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripherals::Peripherals},
    nvs::EspDefaultNvsPartition,
};
use log::{error, info, warn};
use std::sync::Arc;

use mesh_cam_node::communication::mesh::register_event_handlers;
use mesh_cam_node::communication::p2p::DEFAULT_RECEIVE_POLL;
use mesh_cam_node::communication::{MeshHandles, NetworkManager};
use mesh_cam_node::{
    AppConfig, AppController, CameraController, IdlePlan, CameraPins, EspMemoryProbe, EspMesh,
    MeshContext, MeshMonitor, MotionFlag, MotionInput, P2pTaskConfig, PirSensor, SdBusWidth,
    SdCard, ShutdownSignal, StatusLed, ThreadLauncher, VERSION,
};

/// アプリケーションのメインエントリーポイント
fn main() -> anyhow::Result<()> {
    // ESP-IDFの基本初期化
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("mesh-cam-node v{}", VERSION);

    // 設定ファイル読み込み
    let app_config = Arc::new(AppConfig::load().map_err(|e| {
        error!("設定ファイルの読み込みに失敗しました: {}", e);
        anyhow::anyhow!("設定ファイルの読み込みエラー: {}", e)
    })?);

    // ペリフェラルとシステムリソースの初期化
    info!("ペリフェラルを初期化しています");
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let pins = peripherals.pins;

    // ステータスLEDの初期化
    let mut led = StatusLed::new(pins.gpio33)?;

    // カメラ初期化（失敗時は終了）
    let mut camera_pins = CameraPins::new(
        pins.gpio32, pins.gpio0, pins.gpio5, pins.gpio18, pins.gpio19,
        pins.gpio21, pins.gpio36, pins.gpio39, pins.gpio34, pins.gpio35,
        pins.gpio25, pins.gpio23, pins.gpio22, pins.gpio26, pins.gpio27,
    );
    let mut camera = match CameraController::new(
        &mut camera_pins,
        app_config.frame_size,
        app_config.jpeg_quality,
    ) {
        Ok(camera) => camera,
        Err(e) => {
            error!("カメラの初期化に失敗しました: {}", e);
            led.blink_error()?;
            return Err(e.into());
        }
    };

    // SDカードのマウント（失敗時は終了）。1ビットモードではGPIO12が空く
    let (sd_card, pir_pin) = match app_config.sd_bus_width {
        SdBusWidth::One => (
            SdCard::mount_1bit(
                peripherals.sdmmc1,
                pins.gpio14,
                pins.gpio15,
                pins.gpio2,
                &app_config.sd_mount_point,
                app_config.sd_max_files,
            ),
            Some(pins.gpio12),
        ),
        SdBusWidth::Four => (
            SdCard::mount_4bit(
                peripherals.sdmmc1,
                pins.gpio14,
                pins.gpio15,
                pins.gpio2,
                pins.gpio4,
                pins.gpio12,
                pins.gpio13,
                &app_config.sd_mount_point,
                app_config.sd_max_files,
            ),
            None,
        ),
    };
    let sd_card = match sd_card {
        Ok(card) => card,
        Err(e) => {
            error!("SDカードのマウントに失敗しました: {}", e);
            led.blink_error()?;
            return Err(e.into());
        }
    };

    // 設定に応じてフォーマット（失敗時は終了）
    if app_config.sd_format.needs_format(sd_card.volume_readable()) {
        if let Err(e) = sd_card.format() {
            led.blink_error()?;
            return Err(e.into());
        }
    }

    // 人感センサー
    let mut motion: Box<dyn MotionInput> = match (app_config.motion_sensor_enabled, pir_pin) {
        (true, Some(pin)) => match PirSensor::new(pin, MotionFlag::new()) {
            Ok(sensor) => {
                info!("人感センサーを有効化しました (GPIO12)");
                Box::new(sensor)
            }
            Err(e) => {
                warn!("人感センサーの初期化に失敗しました: {:?}", e);
                Box::new(MotionFlag::new())
            }
        },
        _ => Box::new(MotionFlag::new()),
    };

    // メッシュ（失敗してもカメラ機能は継続）
    let _mesh = if app_config.mesh_enabled {
        match start_mesh_node(peripherals.modem, &sysloop, &nvs_partition, &app_config) {
            Ok(handles) => Some(handles),
            Err(e) => {
                error!("メッシュの初期化に失敗しました。メッシュなしで続行します: {:?}", e);
                None
            }
        }
    } else {
        info!("メッシュは無効です");
        None
    };

    // 起動時の撮影と保存
    led.indicate_capturing()?;
    let saved = AppController::capture_initial_photo(
        &mut camera,
        sd_card.store(),
        app_config.camera_warmup_delay,
        app_config.camera_warmup_frames,
        &app_config.photo_file_name,
    );
    match saved {
        Some(_) => led.blink_success()?,
        None => led.blink_error()?,
    }

    let plan = IdlePlan {
        poll: app_config.motion_poll,
        capture_on_motion: app_config.capture_on_motion,
        capture_interval: app_config.capture_interval,
        file_name: app_config.photo_file_name.clone(),
    };

    // 以降撮影しないならSDカードをアンマウントする
    let store = sd_card.store().clone();
    let _sd_card = if plan.needs_camera() {
        Some(sd_card)
    } else {
        drop(sd_card);
        None
    };

    // このシグナルは発行しないため、アイドルループは電源断まで続く
    let shutdown = ShutdownSignal::new();
    AppController::run_idle_loop(&mut camera, &store, motion.as_mut(), &plan, &shutdown);

    Ok(())
}

/// WiFiを準備し、イベントハンドラ登録後にメッシュを開始します
fn start_mesh_node(
    modem: Modem,
    sysloop: &EspSystemEventLoop,
    nvs_partition: &EspDefaultNvsPartition,
    app_config: &AppConfig,
) -> anyhow::Result<MeshHandles> {
    let handles = NetworkManager::prepare_wifi_for_mesh(modem, sysloop, nvs_partition)?;

    let ctx = Arc::new(MeshContext::new(app_config.mesh_id));
    let network = Arc::new(EspMesh::new());
    let launcher = ThreadLauncher::new(
        Arc::clone(&network),
        EspMemoryProbe,
        P2pTaskConfig {
            interval: app_config.p2p_interval,
            stack_size: app_config.p2p_task_stack_size,
            receive_poll: DEFAULT_RECEIVE_POLL,
        },
    );
    let monitor = Arc::new(MeshMonitor::new(ctx, network, handles.sta_dhcp(), launcher));

    register_event_handlers(monitor)?;
    NetworkManager::start_mesh(app_config)?;

    Ok(handles)
}
