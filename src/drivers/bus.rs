//! Bus transaction layer for the inertial sensor.
//!
//! Every register access follows the same bracket: claim the bus (assert
//! the device select line), run one full-duplex transfer, release. Release
//! must happen on every exit path or other bus users starve.

/// Claim failures and transfer failures stay distinct so a diagnostic log
/// can tell a contended bus from a broken one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    ClaimFailed,
    TransferFailed,
}

/// Exclusive access to the sensor's communication bus.
///
/// Exclusivity is carried by `&mut` ownership; `claim` asserts the select
/// line and fails if the claim/release bracket is violated. `transfer`
/// exchanges `tx` and `rx` in full duplex and requires a held claim.
pub trait SensorBus {
    fn claim(&mut self) -> Result<(), BusError>;
    fn release(&mut self);
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError>;
}

// ── SPI implementation ────────────────────────────────────────────────────────

#[cfg(feature = "firmware")]
mod spi {
    use embassy_stm32::dma::NoDma;
    use embassy_stm32::gpio::{AnyPin, Output};
    use embassy_stm32::spi::{Instance, Spi};

    use super::{BusError, SensorBus};

    /// Blocking SPI bus with a dedicated chip-select line.
    pub struct SpiSensorBus<'d, T: Instance> {
        spi: Spi<'d, T, NoDma, NoDma>,
        cs: Output<'d, AnyPin>,
        claimed: bool,
    }

    impl<'d, T: Instance> SpiSensorBus<'d, T> {
        pub fn new(spi: Spi<'d, T, NoDma, NoDma>, cs: Output<'d, AnyPin>) -> Self {
            Self {
                spi,
                cs,
                claimed: false,
            }
        }
    }

    impl<'d, T: Instance> SensorBus for SpiSensorBus<'d, T> {
        fn claim(&mut self) -> Result<(), BusError> {
            if self.claimed {
                return Err(BusError::ClaimFailed);
            }
            self.cs.set_low();
            self.claimed = true;
            Ok(())
        }

        fn release(&mut self) {
            self.cs.set_high();
            self.claimed = false;
        }

        fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
            if !self.claimed {
                return Err(BusError::ClaimFailed);
            }
            self.spi
                .blocking_transfer(rx, tx)
                .map_err(|_| BusError::TransferFailed)
        }
    }
}

#[cfg(feature = "firmware")]
pub use spi::SpiSensorBus;

// ── Test double ───────────────────────────────────────────────────────────────

/// Scripted bus for driver tests: replies come from a queue, failures are
/// injectable, and the claim/release bracket is checked on every call.
#[cfg(test)]
pub struct MockBus {
    replies: heapless::Deque<heapless::Vec<u8, 16>, 32>,
    pub fail_claim: bool,
    pub fail_transfer: bool,
    claimed: bool,
    pub claims: usize,
    pub releases: usize,
    pub written: heapless::Deque<heapless::Vec<u8, 16>, 32>,
}

#[cfg(test)]
impl MockBus {
    pub fn new() -> Self {
        Self {
            replies: heapless::Deque::new(),
            fail_claim: false,
            fail_transfer: false,
            claimed: false,
            claims: 0,
            releases: 0,
            written: heapless::Deque::new(),
        }
    }

    /// Queue the rx bytes for one upcoming transfer (index 0 is the byte
    /// clocked out while the register address goes over the wire).
    pub fn push_reply(&mut self, bytes: &[u8]) {
        let mut reply = heapless::Vec::new();
        reply.extend_from_slice(bytes).unwrap();
        self.replies.push_back(reply).unwrap();
    }

    /// True when every claim has been matched by a release.
    pub fn balanced(&self) -> bool {
        !self.claimed && self.claims == self.releases
    }
}

#[cfg(test)]
impl SensorBus for MockBus {
    fn claim(&mut self) -> Result<(), BusError> {
        if self.fail_claim || self.claimed {
            return Err(BusError::ClaimFailed);
        }
        self.claimed = true;
        self.claims += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.claimed = false;
        self.releases += 1;
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        assert!(self.claimed, "transfer outside claim/release bracket");
        let mut record = heapless::Vec::new();
        record.extend_from_slice(tx).unwrap();
        self.written.push_back(record).unwrap();
        if self.fail_transfer {
            return Err(BusError::TransferFailed);
        }
        if let Some(reply) = self.replies.pop_front() {
            for (dst, src) in rx.iter_mut().zip(reply.iter()) {
                *dst = *src;
            }
        }
        Ok(())
    }
}
