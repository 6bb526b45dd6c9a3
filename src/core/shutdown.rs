use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// バックグラウンドタスク停止用のシグナル
///
/// 値を流さないチャネルの送信側を破棄すると、すべての受信側が切断を観測します。
/// ループ先頭で `is_triggered()` を確認し、待機は `wait_timeout()` で行うことで
/// 停止要求に即座に反応できます。一度立てたら戻りません。
///
/// `child()` で作った子シグナルは親の停止に連動しますが、子だけを止めても
/// 親には影響しません。
pub struct ShutdownSignal {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
    children: Mutex<Vec<Weak<ShutdownSignal>>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            children: Mutex::new(Vec::new()),
        }
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 停止を要求し、待機中のタスクと子シグナルを起こす
    pub fn trigger(&self) {
        drop(lock(&self.sender).take());

        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.trigger();
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// 最大 `timeout` だけ待機します。停止要求があれば `true`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(
            self.receiver.recv_timeout(timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }

    /// 親の停止に連動する子シグナルを作ります
    ///
    /// 親が停止済みなら、子も停止済みの状態で返ります。
    pub fn child(&self) -> Arc<ShutdownSignal> {
        let child = Arc::new(ShutdownSignal::new());
        let mut children = lock(&self.children);
        if self.is_triggered() {
            child.trigger();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        child
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
