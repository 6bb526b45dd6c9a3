use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 人感センサーの検知フラグ
///
/// 割り込みハンドラが `trigger()` で立て、アイドルループが `take()` で消費します。
/// 消費までに複数回検知しても1回として扱います。
#[derive(Debug, Clone, Default)]
pub struct MotionFlag(Arc<AtomicBool>);

impl MotionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 割り込みコンテキストから呼ばれる。ロックもアロケーションもしない
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// フラグを読み取って下ろす
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// アイドルループが参照する人感入力
pub trait MotionInput {
    /// 前回呼び出し以降に検知があったか（読み取りで消費される）
    fn take_motion(&mut self) -> bool;
}

impl MotionInput for MotionFlag {
    fn take_motion(&mut self) -> bool {
        self.take()
    }
}
