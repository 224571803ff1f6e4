use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// 預設自動儲存間隔。 / Default auto-save period.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(120);

/// 自動儲存計時器。 / Auto-save timer.
///
/// A detached thread sends one tick per period; the owner polls
/// [`AutoSave::is_due`] from the UI thread. The timer thread exits on the
/// first tick after the `AutoSave` is dropped.
#[derive(Debug)]
pub struct AutoSave {
    ticks: Receiver<()>,
    interval: Duration,
}

impl AutoSave {
    pub fn start(interval: Duration) -> Self {
        let (sender, ticks) = mpsc::channel();
        thread::spawn(move || loop {
            thread::sleep(interval);
            if sender.send(()).is_err() {
                break;
            }
        });
        Self { ticks, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 是否已到儲存時間；會消耗所有累積的計時。 / Whether at least one tick arrived; drains pending ticks.
    pub fn is_due(&self) -> bool {
        let mut due = false;
        loop {
            match self.ticks.try_recv() {
                Ok(()) => due = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return due,
            }
        }
    }
}
