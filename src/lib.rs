//! Conversion of hourly global and diffuse horizontal irradiance into
//! total irradiance on a tilted, arbitrarily oriented surface.

pub mod config;
pub mod error;
pub mod records;
pub mod table;
pub mod tools;

pub use config::{Config, SiteConfig, SurfaceConfig};
pub use records::{ComputedRecord, HourlyRecord};
pub use tools::sun::{compute_tilted_irradiance, Transform};
