//! Sensor Device Protocol
//!
//! This crate provides the data types exchanged with the environmental sensor
//! device (readings, range profiles, indicator colors) and an async HTTP
//! client for deployments where the device exposes a pollable endpoint.

mod client;
mod color;
mod error;
mod parameter;
mod profile;

pub use client::{DeviceConfig, IndicatorDevice, ReadingSource, SensorClient};
pub use color::{IndicatorCommand, StatusColor};
pub use error::DeviceError;
pub use parameter::{Parameter, RawReading, Reading};
pub use profile::{Bounds, ItemId, RangeProfile};
