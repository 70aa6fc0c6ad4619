#![no_std]
#![no_main]

mod board;

use embassy_executor::Spawner;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, Pin, Pull, Speed};
use embassy_stm32::peripherals::{PC4, SPI1};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use gimbal_controller_rust::drivers::bus::SpiSensorBus;
use gimbal_controller_rust::drivers::mpu6050::{Mpu6050, Mpu6050Config};
use gimbal_controller_rust::settings::CameraStabSettings;
use gimbal_controller_rust::state::{
    AccelSample, CameraCommand, GyroSample, SharedAccessories, SharedAttitude,
    SENSOR_QUEUE_DEPTH,
};
use gimbal_controller_rust::tasks::sensor_task::{self, DataReadySignal};
use gimbal_controller_rust::tasks::stab_task::{self, SettingsSignal};

use crate::board::Board;

// ── Sensor queues ─────────────────────────────────────────────────────────────
//  Depth 2, drop-newest on overflow: the fusion consumer is expected to keep
//  up and a dropped burst sample is not an error.
static ACCEL_CHAN: Channel<CriticalSectionRawMutex, AccelSample, SENSOR_QUEUE_DEPTH> =
    Channel::new();
static GYRO_CHAN: Channel<CriticalSectionRawMutex, GyroSample, SENSOR_QUEUE_DEPTH> =
    Channel::new();

// ── Stabilization plumbing ────────────────────────────────────────────────────
//  Cap=1: the servo mixer always wants the LATEST command; older values are
//  dropped.
static CAMERA_CHAN: Channel<CriticalSectionRawMutex, CameraCommand, 1> = Channel::new();

/// Set from the IMU data-ready edge; the sensor task blocks on it.
static DATA_READY: DataReadySignal = Signal::new();

/// Written by the attitude estimator, read every stab tick.
static ATTITUDE: SharedAttitude = SharedAttitude::new();

/// Written by the receiver path, read every stab tick.
static ACCESSORIES: SharedAccessories = SharedAccessories::new();

/// Configuration change notification: a whole settings block per signal.
static SETTINGS: SettingsSignal = Signal::new();

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// The interrupt side of the handoff: forward each data-ready edge to the
/// wake signal. No I/O happens here.
#[embassy_executor::task]
async fn data_ready_task(mut imu_int: ExtiInput<'static, PC4>) {
    loop {
        imu_int.wait_for_rising_edge().await;
        DATA_READY.signal(());
    }
}

#[embassy_executor::task]
async fn imu_task(imu: Mpu6050<SpiSensorBus<'static, SPI1>>) {
    sensor_task::run(imu, &DATA_READY, ACCEL_CHAN.sender(), GYRO_CHAN.sender()).await
}

#[embassy_executor::task]
async fn camera_stab_task() {
    stab_task::run(&ATTITUDE, &ACCESSORIES, &SETTINGS, CAMERA_CHAN.sender()).await
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;

    // 2. SPI1 @ 1 MHz — MPU6050 (SCK=PA5, MOSI=PA7, MISO=PA6, CS=PA4)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = TimeHertz(1_000_000);

    use embassy_stm32::dma::NoDma;
    let spi = Spi::new(p.SPI1, p.PA5, p.PA7, p.PA6, NoDma, NoDma, spi_config);
    let cs = Output::new(p.PA4.degrade(), Level::High, Speed::VeryHigh);

    // 3. IMU data-ready interrupt line (INT=PC4, push-pull active high)
    let imu_int = ExtiInput::new(Input::new(p.PC4, Pull::Down), p.EXTI4);

    // 4. Heartbeat LED (PC13)
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);

    // 5. Filter bank: initial settings snapshot, then the periodic task.
    //    The estimator and receiver feed ATTITUDE/ACCESSORIES from outside
    //    this core.
    SETTINGS.signal(CameraStabSettings::default());
    spawner.spawn(camera_stab_task()).unwrap();

    // 6. Sensor driver: identity check + config. A mismatch aborts the
    //    driver only; the rest of the system keeps running.
    Timer::after(Duration::from_millis(100)).await;
    let mut imu = Mpu6050::new(SpiSensorBus::new(spi, cs), Mpu6050Config::default());
    match imu.init().await {
        Ok(()) => {
            spawner.spawn(data_ready_task(imu_int)).unwrap();
            spawner.spawn(imu_task(imu)).unwrap();
        }
        Err(e) => defmt::error!("MPU6050 init failed: {}", e),
    }

    // 7. Main task: LED heartbeat @ 1 Hz
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
