//! Periodic stabilization task: drives the filter bank off a fixed-period
//! ticker, swapping in settings snapshots between ticks and publishing the
//! latest command.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};

use crate::drivers::camstab::{CameraStab, SAMPLE_PERIOD_MS};
use crate::settings::CameraStabSettings;
use crate::state::{CameraCommand, SharedAccessories, SharedAttitude};

/// Change-notification slot: the configuration side signals a whole new
/// settings block, the task re-fetches it atomically between ticks.
pub type SettingsSignal = Signal<CriticalSectionRawMutex, CameraStabSettings>;

pub type CameraSender = Sender<'static, CriticalSectionRawMutex, CameraCommand, 1>;

pub async fn run(
    attitude: &'static SharedAttitude,
    accessories: &'static SharedAccessories,
    settings: &'static SettingsSignal,
    camera_tx: CameraSender,
) -> ! {
    let initial = settings.try_take().unwrap_or_default();
    let mut stab = CameraStab::new(initial, Instant::now().as_millis() as i64);

    crate::log_info!("camera stab task started");
    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_PERIOD_MS));
    loop {
        ticker.next().await;

        if let Some(new_settings) = settings.try_take() {
            stab.apply_settings(new_settings);
        }

        let now_ms = Instant::now().as_millis() as i64;
        if let Some(cmd) = stab.update(now_ms, attitude.load(), &accessories.snapshot()) {
            // Latest-wins handoff; the consumer may miss a frame if busy
            let _ = camera_tx.try_send(cmd);
        }
    }
}
