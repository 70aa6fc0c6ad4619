#![cfg_attr(not(test), no_std)]

//! Camera-gimbal stabilization core: interrupt-driven MPU6050 acquisition
//! feeding bounded sensor queues, plus the periodic filter bank that turns
//! attitude estimates into normalized gimbal commands.
//!
//! Hardware bring-up lives in the `firmware` binary; everything here is
//! portable and host-testable.

pub mod drivers;
pub mod logging;
pub mod settings;
pub mod state;
pub mod tasks;
