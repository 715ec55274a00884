use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Timelike};
use uom::si::{
    angle::degree,
    f64::{Angle, HeatFluxDensity, Time},
    heat_flux_density::watt_per_square_meter,
    time::second,
};

use crate::error::ConfigError;
use crate::tools::calendar::{CalendarDays, DayMapping, HourIndexDays};
use crate::tools::sun::SOLAR_CONST;

/// Typical ground albedo used when the configuration doesn't specify one.
pub const DEFAULT_GROUND_REFLECTANCE: f64 = 0.2;

/// Geographic location of the measurement site.
///
/// Longitude and standard meridian must use the same sign convention. The
/// solar time correction is exact for longitudes counted positive to the west.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiteConfig {
    pub latitude: Angle,
    pub longitude: Angle,
    /// Longitude of the meridian the local civil time is referenced to
    pub standard_meridian: Angle,
}

impl SiteConfig {
    /// All arguments in degrees.
    pub fn new(latitude: f64, longitude: f64, standard_meridian: f64) -> Result<Self, ConfigError> {
        Ok(SiteConfig {
            latitude: checked_angle("latitude", latitude, -90.0, 90.0)?,
            longitude: checked_angle("longitude", longitude, -180.0, 180.0)?,
            standard_meridian: checked_angle(
                "standard_meridian",
                standard_meridian,
                -180.0,
                180.0,
            )?,
        })
    }
}

/// Orientation and surroundings of the collector surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceConfig {
    /// Angle between the surface and the horizontal plane, 0 = horizontal
    pub tilt: Angle,
    /// Deviation of the surface normal projection from the local meridian,
    /// 0 = facing the equator
    pub azimuth: Angle,
    pub ground_reflectance: f64,
}

impl SurfaceConfig {
    /// `tilt` and `azimuth` in degrees, `ground_reflectance` as a fraction.
    pub fn new(tilt: f64, azimuth: f64, ground_reflectance: f64) -> Result<Self, ConfigError> {
        if !ground_reflectance.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "ground_reflectance",
            });
        }
        if !(0.0..=1.0).contains(&ground_reflectance) {
            return Err(ConfigError::ReflectanceOutOfRange(ground_reflectance));
        }
        Ok(SurfaceConfig {
            tilt: checked_angle("tilt", tilt, 0.0, 90.0)?,
            azimuth: checked_angle("azimuth", azimuth, -180.0, 360.0)?,
            ground_reflectance,
        })
    }
}

/// Everything the transform needs, validated once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub site: SiteConfig,
    pub surface: SurfaceConfig,
    pub solar_constant: HeatFluxDensity,
    /// Local civil time of hour index 0. Day numbers and clock times of all
    /// hours are counted from it. When unset, the hour index is assumed to
    /// start at local midnight at the beginning of the year.
    pub calendar_start: Option<DateTime<FixedOffset>>,
}

impl Config {
    pub fn new(site: SiteConfig, surface: SurfaceConfig) -> Self {
        Config {
            site,
            surface,
            solar_constant: HeatFluxDensity::new::<watt_per_square_meter>(SOLAR_CONST),
            calendar_start: None,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let string = fs::read_to_string(path)?;
        Self::from_json(&string)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let loaded: as_loaded::Config = json5::from_str(json)?;
        let converted = loaded.try_into()?;
        Ok(converted)
    }

    /// Local clock time of hour index 0, measured from midnight. Zero when
    /// no calendar start is configured.
    pub fn start_time_of_day(&self) -> Time {
        let seconds = self
            .calendar_start
            .map_or(0, |start| start.num_seconds_from_midnight());
        Time::new::<second>(f64::from(seconds))
    }

    /// Hour index to day number mapping implied by this configuration.
    pub fn day_mapping(&self) -> Box<dyn DayMapping> {
        match self.calendar_start {
            Some(start) => Box::new(CalendarDays::new(start)),
            None => Box::new(HourIndexDays),
        }
    }
}

impl TryFrom<as_loaded::Config> for Config {
    type Error = ConfigError;
    fn try_from(value: as_loaded::Config) -> Result<Self, Self::Error> {
        let site = SiteConfig::new(
            value.site.latitude,
            value.site.longitude,
            value.site.standard_meridian,
        )?;
        let surface = SurfaceConfig::new(
            value.surface.tilt,
            value.surface.azimuth,
            value.surface.ground_reflectance,
        )?;

        if !value.solar_constant.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "solar_constant",
            });
        }
        if value.solar_constant <= 0.0 {
            return Err(ConfigError::InvalidSolarConstant(value.solar_constant));
        }

        let calendar_start = value
            .calendar
            .map(|calendar| {
                DateTime::parse_from_rfc3339(&calendar.start).map_err(|e| {
                    ConfigError::InvalidCalendarStart {
                        value: calendar.start.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()?;

        Ok(Config {
            site,
            surface,
            solar_constant: HeatFluxDensity::new::<watt_per_square_meter>(value.solar_constant),
            calendar_start,
        })
    }
}

fn checked_angle(name: &'static str, value: f64, min: f64, max: f64) -> Result<Angle, ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { name });
    }
    if !(min..=max).contains(&value) {
        return Err(ConfigError::AngleOutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(Angle::new::<degree>(value))
}

/// Mirror of the configuration file. Angles are in degrees, irradiance in W/m^2.
mod as_loaded {
    use serde::Deserialize;

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Config {
        pub site: Site,
        pub surface: Surface,
        #[serde(default = "default_solar_constant")]
        pub solar_constant: f64,
        #[serde(default)]
        pub calendar: Option<Calendar>,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Site {
        pub latitude: f64,
        pub longitude: f64,
        pub standard_meridian: f64,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Surface {
        pub tilt: f64,
        #[serde(default)]
        pub azimuth: f64,
        #[serde(default = "default_ground_reflectance")]
        pub ground_reflectance: f64,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Calendar {
        /// RFC 3339 timestamp of hour index 0
        pub start: String,
    }

    fn default_solar_constant() -> f64 {
        super::SOLAR_CONST
    }

    fn default_ground_reflectance() -> f64 {
        super::DEFAULT_GROUND_REFLECTANCE
    }
}
