use log::{error, info};
use std::time::{Duration, Instant};

use crate::core::capture_service::{CaptureService, SavedFrame};
use crate::core::motion::MotionInput;
use crate::core::shutdown::ShutdownSignal;
use crate::hardware::camera::FrameSource;
use crate::storage::FileStore;

/// アイドルループの動作設定
#[derive(Debug, Clone)]
pub struct IdlePlan {
    /// ループ周期
    pub poll: Duration,
    /// 人感検知時に撮影するか（無効時はログのみ）
    pub capture_on_motion: bool,
    /// 定期撮影間隔（`None` で無効）
    pub capture_interval: Option<Duration>,
    /// 保存ファイル名（毎回上書き）
    pub file_name: String,
}

impl IdlePlan {
    /// 撮影が発生し得るか。発生しないならSDカードは不要
    pub fn needs_camera(&self) -> bool {
        self.capture_on_motion || self.capture_interval.is_some()
    }
}

/// アイドルループの集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdleStats {
    pub polls: u32,
    pub motion_events: u32,
    pub captures: u32,
    pub capture_failures: u32,
}

/// 撮影・保存以降のアプリケーション制御フロー
pub struct AppController;

impl AppController {
    /// 起動時の撮影
    ///
    /// ウォームアップ待機の後、指定フレーム数を読み捨ててから1枚撮影して保存します。
    pub fn capture_initial_photo<C: FrameSource, S: FileStore>(
        camera: &mut C,
        store: &S,
        warmup_delay: Duration,
        warmup_frames: u32,
        file_name: &str,
    ) -> Option<SavedFrame> {
        info!("カメラ安定待ち: {:?}", warmup_delay);
        std::thread::sleep(warmup_delay);
        CaptureService::warm_up(camera, warmup_frames);

        info!("撮影中...");
        match CaptureService::capture_and_save(camera, store, file_name) {
            Ok(saved) => Some(saved),
            Err(e) => {
                error!("起動時の撮影に失敗: {}", e);
                None
            }
        }
    }

    /// 停止シグナルが立つまでアイドルループを実行します
    ///
    /// 周期ごとに人感フラグを消費し、設定に応じて撮影します。
    pub fn run_idle_loop<C, S, M>(
        camera: &mut C,
        store: &S,
        motion: &mut M,
        plan: &IdlePlan,
        shutdown: &ShutdownSignal,
    ) -> IdleStats
    where
        C: FrameSource,
        S: FileStore,
        M: MotionInput + ?Sized,
    {
        let mut stats = IdleStats::default();
        let mut last_capture = Instant::now();

        info!(
            "アイドルループ開始 (周期: {:?}, 検知時撮影: {}, 定期撮影: {:?})",
            plan.poll, plan.capture_on_motion, plan.capture_interval
        );

        while !shutdown.is_triggered() {
            stats.polls += 1;

            let mut capture_now = false;
            if motion.take_motion() {
                stats.motion_events += 1;
                info!("人感センサー検知 (Motion detected)");
                capture_now = plan.capture_on_motion;
            }

            if let Some(interval) = plan.capture_interval {
                if last_capture.elapsed() >= interval {
                    capture_now = true;
                }
            }

            if capture_now {
                last_capture = Instant::now();
                match CaptureService::capture_and_save(camera, store, &plan.file_name) {
                    Ok(_) => stats.captures += 1,
                    Err(e) => {
                        stats.capture_failures += 1;
                        error!("撮影に失敗: {}", e);
                    }
                }
            }

            if shutdown.wait_timeout(plan.poll) {
                break;
            }
        }

        info!("アイドルループ終了: {:?}", stats);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motion::MotionFlag;
    use crate::hardware::camera::CameraError;
    use crate::storage::MountedStore;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    struct FixedCamera {
        calls: usize,
    }

    impl FrameSource for FixedCamera {
        fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
            self.calls += 1;
            Ok(vec![0xFF, 0xD8, self.calls as u8, 0xFF, 0xD9])
        }
    }

    /// 指定回数のポーリング後に停止シグナルを立てる人感入力
    struct ScriptedMotion {
        pattern: Vec<bool>,
        index: usize,
        shutdown: Arc<ShutdownSignal>,
    }

    impl MotionInput for ScriptedMotion {
        fn take_motion(&mut self) -> bool {
            let detected = self.pattern.get(self.index).copied().unwrap_or(false);
            self.index += 1;
            if self.index >= self.pattern.len() {
                self.shutdown.trigger();
            }
            detected
        }
    }

    fn plan(capture_on_motion: bool) -> IdlePlan {
        IdlePlan {
            poll: Duration::from_millis(1),
            capture_on_motion,
            capture_interval: None,
            file_name: "picture.jpg".to_string(),
        }
    }

    #[test]
    fn motion_is_logged_only_by_default() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let shutdown = Arc::new(ShutdownSignal::new());
        let mut camera = FixedCamera { calls: 0 };
        let mut motion = ScriptedMotion {
            pattern: vec![false, true, false, true],
            index: 0,
            shutdown: Arc::clone(&shutdown),
        };

        let stats = AppController::run_idle_loop(&mut camera, &store, &mut motion, &plan(false), &shutdown);

        assert_eq!(stats.motion_events, 2);
        assert_eq!(stats.captures, 0);
        assert_eq!(camera.calls, 0);
    }

    #[test]
    fn motion_triggers_capture_when_enabled() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let shutdown = Arc::new(ShutdownSignal::new());
        let mut camera = FixedCamera { calls: 0 };
        let mut motion = ScriptedMotion {
            pattern: vec![true, false, true],
            index: 0,
            shutdown: Arc::clone(&shutdown),
        };

        let stats = AppController::run_idle_loop(&mut camera, &store, &mut motion, &plan(true), &shutdown);

        assert_eq!(stats.captures, 2);
        assert_eq!(stats.polls, 3);
        assert_eq!(
            std::fs::read(dir.path().join("picture.jpg")).unwrap(),
            vec![0xFF, 0xD8, 2, 0xFF, 0xD9]
        );
    }

    #[test]
    fn loop_exits_when_shutdown_raised_from_another_thread() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let shutdown = Arc::new(ShutdownSignal::new());
        let mut camera = FixedCamera { calls: 0 };
        let mut motion = MotionFlag::new();
        let idle = IdlePlan {
            poll: Duration::from_secs(30),
            ..plan(false)
        };

        let trigger = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                shutdown.trigger();
            })
        };

        let started = Instant::now();
        let stats = AppController::run_idle_loop(&mut camera, &store, &mut motion, &idle, &shutdown);
        trigger.join().unwrap();

        assert_eq!(stats.polls, 1);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn periodic_capture_runs_without_motion() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let shutdown = Arc::new(ShutdownSignal::new());
        let mut camera = FixedCamera { calls: 0 };
        let mut motion = ScriptedMotion {
            pattern: vec![false; 3],
            index: 0,
            shutdown: Arc::clone(&shutdown),
        };
        let idle = IdlePlan {
            capture_interval: Some(Duration::ZERO),
            ..plan(false)
        };

        let stats = AppController::run_idle_loop(&mut camera, &store, &mut motion, &idle, &shutdown);

        assert_eq!(stats.captures, 3);
        assert!(idle.needs_camera());
        assert!(!plan(false).needs_camera());
    }

    #[test]
    fn initial_photo_is_saved_after_warm_up() {
        let dir = tempdir().unwrap();
        let store = MountedStore::new(dir.path());
        let mut camera = FixedCamera { calls: 0 };

        let saved = AppController::capture_initial_photo(
            &mut camera,
            &store,
            Duration::ZERO,
            3,
            "picture.jpg",
        )
        .unwrap();

        assert_eq!(camera.calls, 4);
        assert_eq!(saved.len, 5);
        assert_eq!(saved.path, dir.path().join("picture.jpg"));
    }
}
