//! Sensor driver task: interrupt-to-task handoff and queue publish.
//!
//! The interrupt side only fires the data-ready signal; all I/O happens
//! here in task context. Each wake runs exactly one acquisition cycle.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;

use crate::drivers::bus::{BusError, SensorBus};
use crate::drivers::mpu6050::Mpu6050;
use crate::state::{AccelSample, GyroSample, SENSOR_QUEUE_DEPTH};

/// Binary wake primitive set from the data-ready interrupt. Signalling is
/// non-blocking and allocation-free, so it is safe in interrupt context.
pub type DataReadySignal = Signal<CriticalSectionRawMutex, ()>;

pub type AccelSender = Sender<'static, CriticalSectionRawMutex, AccelSample, SENSOR_QUEUE_DEPTH>;
pub type GyroSender = Sender<'static, CriticalSectionRawMutex, GyroSample, SENSOR_QUEUE_DEPTH>;

/// One acquisition cycle: burst-read, decode, publish to both queues.
/// A full queue drops the newest sample silently; the consumer is expected
/// to keep up in the steady state and bursts must not stall this task.
pub fn run_cycle<B: SensorBus>(
    imu: &mut Mpu6050<B>,
    accel_tx: &AccelSender,
    gyro_tx: &GyroSender,
) -> Result<(), BusError> {
    let (accel, gyro) = imu.read_sample()?;
    let _ = accel_tx.try_send(accel);
    let _ = gyro_tx.try_send(gyro);
    Ok(())
}

/// Task body: block on the wake signal, run one cycle, repeat. A failed
/// cycle publishes nothing and waits for the next interrupt; there is no
/// in-cycle retry.
pub async fn run<B: SensorBus>(
    mut imu: Mpu6050<B>,
    data_ready: &'static DataReadySignal,
    accel_tx: AccelSender,
    gyro_tx: GyroSender,
) -> ! {
    crate::log_info!("sensor task started");
    loop {
        data_ready.wait().await;
        let _ = run_cycle(&mut imu, &accel_tx, &gyro_tx);
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::channel::Channel;

    use super::*;
    use crate::drivers::bus::MockBus;
    use crate::drivers::mpu6050::{Mpu6050Config, FRAME_LEN};

    // Raw gyro Y (data bytes 10..12, shifted one for the address byte)
    // lands on board X at the default 0° orientation.
    fn reply_with_gyro_y(raw: i16) -> [u8; FRAME_LEN + 1] {
        let mut reply = [0u8; FRAME_LEN + 1];
        reply[11..13].copy_from_slice(&raw.to_be_bytes());
        reply
    }

    #[test]
    fn cycle_publishes_one_sample_per_queue() {
        static ACCEL: Channel<CriticalSectionRawMutex, AccelSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();
        static GYRO: Channel<CriticalSectionRawMutex, GyroSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();

        let mut bus = MockBus::new();
        bus.push_reply(&reply_with_gyro_y(655));
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());

        run_cycle(&mut imu, &ACCEL.sender(), &GYRO.sender()).unwrap();

        let gyro = GYRO.receiver().try_receive().unwrap();
        assert!((gyro.x - 10.0).abs() < 1e-4, "got {}", gyro.x);
        assert!(ACCEL.receiver().try_receive().is_ok());
    }

    #[test]
    fn full_queue_drops_newest_and_keeps_oldest() {
        static ACCEL: Channel<CriticalSectionRawMutex, AccelSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();
        static GYRO: Channel<CriticalSectionRawMutex, GyroSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();

        let mut bus = MockBus::new();
        for raw in [100i16, 200, 300] {
            bus.push_reply(&reply_with_gyro_y(raw));
        }
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());

        // Three cycles into depth-2 queues: the third sample must be the
        // one that goes missing, without blocking or panicking.
        for _ in 0..3 {
            run_cycle(&mut imu, &ACCEL.sender(), &GYRO.sender()).unwrap();
        }

        let rx = GYRO.receiver();
        let first = rx.try_receive().unwrap();
        let second = rx.try_receive().unwrap();
        assert!((first.x - 100.0 / 65.5).abs() < 1e-4);
        assert!((second.x - 200.0 / 65.5).abs() < 1e-4);
        assert!(rx.try_receive().is_err(), "queue held more than its capacity");
    }

    #[test]
    fn failed_cycle_publishes_nothing() {
        static ACCEL: Channel<CriticalSectionRawMutex, AccelSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();
        static GYRO: Channel<CriticalSectionRawMutex, GyroSample, SENSOR_QUEUE_DEPTH> =
            Channel::new();

        let mut bus = MockBus::new();
        bus.fail_transfer = true;
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());

        let res = run_cycle(&mut imu, &ACCEL.sender(), &GYRO.sender());
        assert_eq!(res, Err(BusError::TransferFailed));
        assert!(ACCEL.receiver().try_receive().is_err());
        assert!(GYRO.receiver().try_receive().is_err());
    }

    #[test]
    fn wake_signal_hands_off_to_task_context() {
        static DATA_READY: DataReadySignal = Signal::new();
        DATA_READY.signal(());
        embassy_futures::block_on(DATA_READY.wait());
        assert!(DATA_READY.try_take().is_none());
    }
}
