//! MPU6050 6-axis gyro/accel driver.
//!
//! Register reads and writes go through the [`SensorBus`] claim/transfer/
//! release bracket. Raw frames are decoded into the board frame via an
//! orientation lookup table, then scaled to physical units.

use embassy_time::{Duration, Timer};

use crate::drivers::bus::{BusError, SensorBus};
use crate::state::{AccelSample, GyroSample};

// Register map (MPU60x0 datasheet)
const REG_SMPLRT_DIV: u8 = 0x19;
const REG_DLPF_CFG: u8 = 0x1A;
const REG_GYRO_CFG: u8 = 0x1B;
const REG_ACCEL_CFG: u8 = 0x1C;
const REG_INT_CFG: u8 = 0x37;
const REG_INT_EN: u8 = 0x38;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_USER_CTRL: u8 = 0x6A;
const REG_PWR_MGMT: u8 = 0x6B;
const REG_WHOAMI: u8 = 0x75;

const READ_FLAG: u8 = 0x80;
const PWR_MGMT_RESET: u8 = 0x80;
const WHOAMI_VALUE: u8 = 0x68;

/// Accel X/Y/Z, temperature, gyro X/Y/Z, big-endian i16 each.
pub const FRAME_LEN: usize = 14;

pub const GRAVITY_M_S2: f32 = 9.81;

/// Fatal driver failures; bus trouble is wrapped, identity mismatch at
/// init keeps the driver from starting at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    Bus(BusError),
    DeviceMismatch { found: u8 },
}

impl From<BusError> for SensorError {
    fn from(err: BusError) -> Self {
        SensorError::Bus(err)
    }
}

// ── Ranges and orientation ────────────────────────────────────────────────────

/// Gyro full-scale range. Scale factors convert raw LSB to °/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
    Deg250,
    #[default]
    Deg500,
    Deg1000,
    Deg2000,
}

impl GyroRange {
    pub fn register_value(self) -> u8 {
        match self {
            GyroRange::Deg250 => 0x00,
            GyroRange::Deg500 => 0x08,
            GyroRange::Deg1000 => 0x10,
            GyroRange::Deg2000 => 0x18,
        }
    }

    pub fn scale_deg_s(self) -> f32 {
        match self {
            GyroRange::Deg250 => 1.0 / 131.0,
            GyroRange::Deg500 => 1.0 / 65.5,
            GyroRange::Deg1000 => 1.0 / 32.8,
            GyroRange::Deg2000 => 1.0 / 16.4,
        }
    }
}

/// Accel full-scale range. Scale factors convert raw LSB to m/s².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    G2,
    G4,
    #[default]
    G8,
    G16,
}

impl AccelRange {
    pub fn register_value(self) -> u8 {
        match self {
            AccelRange::G2 => 0x00,
            AccelRange::G4 => 0x08,
            AccelRange::G8 => 0x10,
            AccelRange::G16 => 0x18,
        }
    }

    pub fn scale_m_s2(self) -> f32 {
        match self {
            AccelRange::G2 => GRAVITY_M_S2 / 16384.0,
            AccelRange::G4 => GRAVITY_M_S2 / 8192.0,
            AccelRange::G8 => GRAVITY_M_S2 / 4096.0,
            AccelRange::G16 => GRAVITY_M_S2 / 2048.0,
        }
    }
}

/// Mounting rotation of the sensor about its vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    #[default]
    Top0,
    Top90,
    Top180,
    Top270,
}

struct AxisRemap {
    x_src: usize,
    x_sign: i32,
    y_src: usize,
    y_sign: i32,
}

// The sensor's X points right and Y forward; the board convention
// transposes them, so raw X feeds board Y and vice versa at 0°.
const REMAP: [AxisRemap; 4] = [
    // 0°
    AxisRemap { x_src: 1, x_sign: 1, y_src: 0, y_sign: 1 },
    // 90°
    AxisRemap { x_src: 0, x_sign: 1, y_src: 1, y_sign: -1 },
    // 180°
    AxisRemap { x_src: 1, x_sign: -1, y_src: 0, y_sign: -1 },
    // 270°
    AxisRemap { x_src: 0, x_sign: -1, y_src: 1, y_sign: 1 },
];

// ── Frame decode ──────────────────────────────────────────────────────────────

/// One raw register block in the sensor frame.
#[derive(Clone, Copy)]
pub struct RawFrame {
    pub accel: [i16; 3],
    pub temp: i16,
    pub gyro: [i16; 3],
}

/// Split the burst-read block into big-endian raw channels.
pub fn parse_frame(buf: &[u8; FRAME_LEN]) -> RawFrame {
    RawFrame {
        accel: [
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
            i16::from_be_bytes([buf[4], buf[5]]),
        ],
        temp: i16::from_be_bytes([buf[6], buf[7]]),
        gyro: [
            i16::from_be_bytes([buf[8], buf[9]]),
            i16::from_be_bytes([buf[10], buf[11]]),
            i16::from_be_bytes([buf[12], buf[13]]),
        ],
    }
}

/// Rotate raw sensor axes into the board frame. Z is always negated; X and
/// Y come from the orientation table. Widened to i32 so the sign flip of
/// -32768 cannot overflow.
pub fn remap_axes(raw: [i16; 3], orientation: Orientation) -> [i32; 3] {
    let map = &REMAP[orientation as usize];
    [
        map.x_sign * raw[map.x_src] as i32,
        map.y_sign * raw[map.y_src] as i32,
        -(raw[2] as i32),
    ]
}

/// Die temperature in °C per the datasheet's linear transform.
pub fn convert_temp(raw: i16) -> f32 {
    35.0 + (raw as f32 + 512.0) / 340.0
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Static device configuration applied at init.
#[derive(Clone, Copy)]
pub struct Mpu6050Config {
    pub orientation: Orientation,
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
    /// Sample rate divider: output rate = base rate / (div + 1).
    pub sample_rate_div: u8,
    pub dlpf_cfg: u8,
    pub pwr_mgmt_clk: u8,
    pub user_ctrl: u8,
    pub interrupt_cfg: u8,
    pub interrupt_en: u8,
}

impl Default for Mpu6050Config {
    fn default() -> Self {
        Self {
            orientation: Orientation::Top0,
            accel_range: AccelRange::G8,
            gyro_range: GyroRange::Deg500,
            sample_rate_div: 7,
            dlpf_cfg: 0x00,
            pwr_mgmt_clk: 0x01,
            user_ctrl: 0x00,
            // latch until any read; data-ready interrupt enabled
            interrupt_cfg: 0x10,
            interrupt_en: 0x01,
        }
    }
}

pub struct Mpu6050<B> {
    bus: B,
    config: Mpu6050Config,
    accel_range: AccelRange,
    gyro_range: GyroRange,
    orientation: Orientation,
}

impl<B: SensorBus> Mpu6050<B> {
    pub fn new(bus: B, config: Mpu6050Config) -> Self {
        Self {
            bus,
            config,
            accel_range: config.accel_range,
            gyro_range: config.gyro_range,
            orientation: config.orientation,
        }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        let tx = [reg & !READ_FLAG, value];
        let mut rx = [0u8; 2];
        self.bus.claim()?;
        let res = self.bus.transfer(&tx, &mut rx);
        self.bus.release();
        res
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, BusError> {
        let tx = [reg | READ_FLAG, 0x00];
        let mut rx = [0u8; 2];
        self.bus.claim()?;
        let res = self.bus.transfer(&tx, &mut rx);
        self.bus.release();
        res?;
        Ok(rx[1])
    }

    /// Verify the device identity and run the full configuration sequence.
    /// A WHO_AM_I mismatch is fatal: the driver must not start.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        let whoami = self.read_reg(REG_WHOAMI)?;
        if whoami != WHOAMI_VALUE {
            crate::log_error!("MPU6050 WHO_AM_I mismatch: got {:#x}", whoami);
            return Err(SensorError::DeviceMismatch { found: whoami });
        }

        // Soft reset, then wait for the reset bit to clear
        self.write_reg(REG_PWR_MGMT, PWR_MGMT_RESET | self.config.pwr_mgmt_clk)?;
        loop {
            Timer::after(Duration::from_millis(5)).await;
            if self.read_reg(REG_PWR_MGMT)? & PWR_MGMT_RESET == 0 {
                break;
            }
        }
        Timer::after(Duration::from_millis(25)).await;

        self.write_reg(REG_PWR_MGMT, self.config.pwr_mgmt_clk)?;
        self.set_accel_range(self.config.accel_range)?;
        self.write_reg(REG_SMPLRT_DIV, self.config.sample_rate_div)?;
        self.write_reg(REG_DLPF_CFG, self.config.dlpf_cfg)?;
        self.set_gyro_range(self.config.gyro_range)?;
        self.write_reg(REG_USER_CTRL, self.config.user_ctrl)?;
        self.write_reg(REG_PWR_MGMT, self.config.pwr_mgmt_clk)?;
        self.write_reg(REG_INT_CFG, self.config.interrupt_cfg)?;
        self.write_reg(REG_INT_EN, self.config.interrupt_en)?;

        crate::log_info!("MPU6050 initialized");
        Ok(())
    }

    /// Reconfigure the gyro range and keep the scale factor in step.
    pub fn set_gyro_range(&mut self, range: GyroRange) -> Result<(), BusError> {
        self.write_reg(REG_GYRO_CFG, range.register_value())?;
        self.gyro_range = range;
        Ok(())
    }

    /// Reconfigure the accel range and keep the scale factor in step.
    pub fn set_accel_range(&mut self, range: AccelRange) -> Result<(), BusError> {
        self.write_reg(REG_ACCEL_CFG, range.register_value())?;
        self.accel_range = range;
        Ok(())
    }

    /// Burst-read the whole sample block and decode it. A bus failure
    /// aborts the cycle; no partial sample escapes.
    pub fn read_sample(&mut self) -> Result<(AccelSample, GyroSample), BusError> {
        let mut tx = [0u8; FRAME_LEN + 1];
        let mut rx = [0u8; FRAME_LEN + 1];
        tx[0] = REG_ACCEL_XOUT_H | READ_FLAG;

        self.bus.claim()?;
        let res = self.bus.transfer(&tx, &mut rx);
        self.bus.release();
        res?;

        let mut block = [0u8; FRAME_LEN];
        block.copy_from_slice(&rx[1..]);
        let frame = parse_frame(&block);

        let accel = remap_axes(frame.accel, self.orientation);
        let gyro = remap_axes(frame.gyro, self.orientation);
        let temp_c = convert_temp(frame.temp);

        let accel_scale = self.accel_range.scale_m_s2();
        let gyro_scale = self.gyro_range.scale_deg_s();

        Ok((
            AccelSample {
                x: accel[0] as f32 * accel_scale,
                y: accel[1] as f32 * accel_scale,
                z: accel[2] as f32 * accel_scale,
                temp_c,
            },
            GyroSample {
                x: gyro[0] as f32 * gyro_scale,
                y: gyro[1] as f32 * gyro_scale,
                z: gyro[2] as f32 * gyro_scale,
                temp_c,
            },
        ))
    }

    #[cfg(test)]
    pub(crate) fn bus_ref(&self) -> &B {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::drivers::bus::MockBus;

    fn frame_bytes(accel: [i16; 3], temp: i16, gyro: [i16; 3]) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        for (i, v) in accel.iter().enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&v.to_be_bytes());
        }
        buf[6..8].copy_from_slice(&temp.to_be_bytes());
        for (i, v) in gyro.iter().enumerate() {
            buf[8 + i * 2..10 + i * 2].copy_from_slice(&v.to_be_bytes());
        }
        buf
    }

    #[test]
    fn parse_frame_is_big_endian() {
        let buf = frame_bytes([256, -2, 3], 1000, [-256, 5, -6]);
        let frame = parse_frame(&buf);
        assert_eq!(frame.accel, [256, -2, 3]);
        assert_eq!(frame.temp, 1000);
        assert_eq!(frame.gyro, [-256, 5, -6]);
    }

    #[test]
    fn remap_matches_orientation_table() {
        let raw = [100i16, 200, 300];
        assert_eq!(remap_axes(raw, Orientation::Top0), [200, 100, -300]);
        assert_eq!(remap_axes(raw, Orientation::Top90), [100, -200, -300]);
        assert_eq!(remap_axes(raw, Orientation::Top180), [-200, -100, -300]);
        assert_eq!(remap_axes(raw, Orientation::Top270), [-100, 200, -300]);
    }

    #[test]
    fn remap_survives_extreme_raw_values() {
        let raw = [i16::MIN, i16::MIN, i16::MIN];
        let out = remap_axes(raw, Orientation::Top180);
        assert_eq!(out, [32768, 32768, 32768]);
    }

    #[test]
    fn temp_conversion_matches_datasheet() {
        assert!((convert_temp(0) - 36.5).abs() < 0.01);
        assert!((convert_temp(-512) - 35.0).abs() < 1e-6);
    }

    #[test]
    fn gyro_scale_500_gives_10_deg_s_for_655_lsb() {
        let scaled = 655.0 * GyroRange::Deg500.scale_deg_s();
        assert!((scaled - 10.0).abs() < 1e-4, "got {}", scaled);
    }

    #[test]
    fn accel_scale_16g_gives_gravity_for_2048_lsb() {
        let scaled = 2048.0 * AccelRange::G16.scale_m_s2();
        assert!((scaled - GRAVITY_M_S2).abs() < 1e-4);
    }

    #[test]
    fn read_sample_decodes_and_scales() {
        let mut bus = MockBus::new();
        // Raw gyro Y = 655 lands on board X at 0°; ±500 °/s → 10 °/s
        let block = frame_bytes([0, 0, -4096], -512, [0, 655, 0]);
        let mut reply = [0u8; FRAME_LEN + 1];
        reply[1..].copy_from_slice(&block);
        bus.push_reply(&reply);

        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());
        let (accel, gyro) = imu.read_sample().unwrap();

        assert!((gyro.x - 10.0).abs() < 1e-4, "got {}", gyro.x);
        assert_eq!(gyro.y, 0.0);
        // Z is negated: raw -4096 at ±8 g → +1 g up
        assert!((accel.z - GRAVITY_M_S2).abs() < 1e-4, "got {}", accel.z);
        assert!((accel.temp_c - 35.0).abs() < 1e-6);
        assert!(imu.bus_ref().balanced());
    }

    #[test]
    fn read_sample_releases_bus_on_transfer_failure() {
        let mut bus = MockBus::new();
        bus.fail_transfer = true;
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());
        assert!(matches!(imu.read_sample(), Err(BusError::TransferFailed)));
        assert!(imu.bus_ref().balanced());
    }

    #[test]
    fn read_sample_reports_claim_failure() {
        let mut bus = MockBus::new();
        bus.fail_claim = true;
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());
        assert!(matches!(imu.read_sample(), Err(BusError::ClaimFailed)));
    }

    #[test]
    fn init_rejects_wrong_identity() {
        let mut bus = MockBus::new();
        bus.push_reply(&[0, 0x12]);
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());
        let res = block_on(imu.init());
        assert_eq!(res, Err(SensorError::DeviceMismatch { found: 0x12 }));
        assert!(imu.bus_ref().balanced());
    }

    #[test]
    fn init_configures_device_in_order() {
        let mut bus = MockBus::new();
        bus.push_reply(&[0, WHOAMI_VALUE]);
        // every later read sees zeroed rx, so the reset bit reads as clear
        let mut imu = Mpu6050::new(bus, Mpu6050Config::default());
        block_on(imu.init()).unwrap();

        let bus = imu.bus_ref();
        assert!(bus.balanced());
        let written: Vec<u8> = bus.written.iter().map(|tx| tx[0]).collect();
        // whoami read, reset write, reset poll read, then the config writes
        assert_eq!(written[0], REG_WHOAMI | READ_FLAG);
        assert_eq!(written[1], REG_PWR_MGMT);
        assert_eq!(written[2], REG_PWR_MGMT | READ_FLAG);
        assert_eq!(
            &written[3..],
            &[
                REG_PWR_MGMT,
                REG_ACCEL_CFG,
                REG_SMPLRT_DIV,
                REG_DLPF_CFG,
                REG_GYRO_CFG,
                REG_USER_CTRL,
                REG_PWR_MGMT,
                REG_INT_CFG,
                REG_INT_EN,
            ]
        );
    }
}
