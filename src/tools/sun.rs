use rayon::prelude::*;
use uom::si::{
    angle::{degree, radian},
    f64::{Angle, HeatFluxDensity, Time},
    heat_flux_density::watt_per_square_meter,
    ratio::ratio,
    time::{self, minute},
};

use crate::config::{Config, SiteConfig, SurfaceConfig};
use crate::records::{ComputedRecord, HourlyRecord};
use crate::tools::calendar::{DayMapping, HourIndexDays};

pub const SOLAR_CONST: f64 = 1367.0; // W/m^2

/// Smallest value of cos(zenith) used as a divisor. Keeps the beam
/// decomposition finite when the sun is at or below the horizon.
pub const COS_ZENITH_FLOOR: f64 = 1e-6;

// Extraterrestrial solar radiation corrected for the varying earth - sun distance.
//
// # Arguments
// * `solar_constant` - irradiance at the mean earth - sun distance
// * `day_number` - day of the year
//
// # Returns
// * `HeatFluxDensity` - extraterrestrial irradiance on a plane normal to the sun
pub fn get_extraterrestrial_radiation(
    solar_constant: HeatFluxDensity,
    day_number: u64,
) -> HeatFluxDensity {
    let day_angle = Angle::new::<degree>(360.0 * day_number as f64 / 365.0);
    solar_constant * (1.0 + 0.033 * day_angle.cos().get::<ratio>())
}

/// Difference between the apparent and the mean solar time (Spencer 1971).
///
/// # Arguments
/// * `day_number` - day of the year
///
/// # Returns
/// * `Time` - equation of time, in minutes of the order of +-16
pub fn get_equation_of_time(day_number: u64) -> Time {
    let b = Angle::new::<degree>((day_number as f64 - 1.0) * (360.0 / 365.0));
    let e = 229.18
        * (0.000075 + 0.001868 * b.cos().get::<ratio>()
            - 0.032077 * b.sin().get::<ratio>()
            - 0.014615 * (2.0 * b).cos().get::<ratio>()
            - 0.04089 * (2.0 * b).sin().get::<ratio>());
    Time::new::<minute>(e)
}

/// Local apparent (solar) time corresponding to a local clock time.
///
/// The longitude correction is 4 minutes per degree between the standard
/// meridian and the site, `4 * (standard_meridian - longitude)`. This gives
/// true solar time for longitudes counted positive to the west; with
/// east-positive values the correction has the opposite sign.
///
/// # Arguments
/// * `clock_time` - local civil time since midnight of the first day. It may
///   span many days, the hour angle is periodic so the result is the same
/// * `site` - location of the site and its standard meridian
/// * `equation_of_time` - output of `get_equation_of_time` for the same day
///
/// # Returns
/// * `Time` - local apparent time, 12 h is solar noon of the first day
pub fn get_local_apparent_time(clock_time: Time, site: &SiteConfig, equation_of_time: Time) -> Time {
    let longitude_correction = 4.0
        * (site.standard_meridian.get::<degree>() - site.longitude.get::<degree>());
    Time::new::<time::hour>(
        clock_time.get::<time::hour>()
            + (longitude_correction + equation_of_time.get::<minute>()) / 60.0,
    )
}

/// Local clock time of an hour index, counted from midnight of the day the
/// dataset starts.
pub fn get_clock_time(hour: u64, start_time_of_day: Time) -> Time {
    Time::new::<time::hour>(hour as f64) + start_time_of_day
}

/// Angular displacement of the sun from the local meridian, 15 degrees per hour.
/// Negative before solar noon, positive after.
pub fn get_hour_angle(local_apparent_time: Time) -> Angle {
    Angle::new::<degree>((local_apparent_time.get::<time::hour>() - 12.0) * 15.0)
}

/// Solar declination (Cooper 1969), always within +-23.45 degrees.
pub fn get_declination(day_number: u64) -> Angle {
    let position = Angle::new::<degree>((284.0 + day_number as f64) * (360.0 / 365.0));
    Angle::new::<degree>(23.45 * position.sin().get::<ratio>())
}

/// Cosine of the angle between the sun and the zenith.
///
/// # Arguments
/// * `declination` - solar declination of the day
/// * `hour_angle` - angular displacement of the sun from the local meridian
/// * `latitude` - latitude of the site
///
/// # Returns
/// * `f64` - cos(zenith), not clamped. Negative values mean that the sun is
///   below the horizon
pub fn get_cos_zenith(declination: Angle, hour_angle: Angle, latitude: Angle) -> f64 {
    let (sin_d, cos_d) = sin_cos(declination);
    let (sin_p, cos_p) = sin_cos(latitude);
    cos_d * hour_angle.cos().get::<ratio>() * cos_p + sin_d * sin_p
}

/// Cosine of the angle of incidence of beam radiation on the tilted surface.
///
/// This is the projection of the sun vector onto the surface normal.
///
/// # Arguments
/// * `declination` - solar declination of the day
/// * `hour_angle` - angular displacement of the sun from the local meridian
/// * `latitude` - latitude of the site
/// * `surface` - tilt and azimuth of the surface, the azimuth measured from
///   the equator facing direction, positive to the west
///
/// # Returns
/// * `f64` - cos(incidence), negative when the sun is behind the surface
pub fn get_cos_incidence(
    declination: Angle,
    hour_angle: Angle,
    latitude: Angle,
    surface: &SurfaceConfig,
) -> f64 {
    let (sin_d, cos_d) = sin_cos(declination);
    let (sin_p, cos_p) = sin_cos(latitude);
    let (sin_w, cos_w) = sin_cos(hour_angle);
    let (sin_b, cos_b) = sin_cos(surface.tilt);
    let (sin_g, cos_g) = sin_cos(surface.azimuth);

    sin_b * cos_g * (cos_d * cos_w * sin_p - sin_d * cos_p)
        + sin_b * sin_g * cos_d * sin_w
        + cos_b * (cos_d * cos_w * cos_p + sin_d * sin_p)
}

fn sin_cos(angle: Angle) -> (f64, f64) {
    (angle.sin().get::<ratio>(), angle.cos().get::<ratio>())
}

/// Beam component of the measured global irradiance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamIrradiance {
    /// On a plane normal to the sun
    pub normal: HeatFluxDensity,
    /// On the horizontal plane
    pub horizontal: HeatFluxDensity,
}

impl BeamIrradiance {
    /// Split the beam part out of global and diffuse horizontal irradiance.
    /// When the sun is near or below the horizon the normal component is
    /// divided by the floor value instead and saturates.
    pub fn new(global: HeatFluxDensity, diffuse: HeatFluxDensity, cos_zenith: f64) -> Self {
        let normal = (global - diffuse) / cos_zenith.max(COS_ZENITH_FLOOR);
        BeamIrradiance {
            normal,
            horizontal: normal * cos_zenith,
        }
    }
}

/// Ratios converting horizontal irradiance components to the tilted plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiltFactors {
    /// r_b, beam
    pub beam: f64,
    /// r_d, isotropic sky diffuse
    pub diffuse: f64,
    /// r_r, isotropic ground reflection
    pub reflected: f64,
}

impl TiltFactors {
    pub fn new(cos_incidence: f64, cos_zenith: f64, surface: &SurfaceConfig) -> Self {
        let cos_tilt = surface.tilt.cos().get::<ratio>();
        TiltFactors {
            beam: cos_incidence / cos_zenith.max(COS_ZENITH_FLOOR),
            diffuse: (1.0 + cos_tilt) / 2.0,
            reflected: surface.ground_reflectance * (1.0 - cos_tilt) / 2.0,
        }
    }

    /// Total irradiance on the tilted surface
    pub fn apply(&self, beam: HeatFluxDensity, diffuse: HeatFluxDensity) -> HeatFluxDensity {
        beam * self.beam + diffuse * self.diffuse + (beam + diffuse) * self.reflected
    }
}

/// Position of the sun relative to the site and the surface for one hour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarGeometry {
    pub day_number: u64,
    pub extraterrestrial_radiation: HeatFluxDensity,
    pub equation_of_time: Time,
    pub local_apparent_time: Time,
    pub hour_angle: Angle,
    pub declination: Angle,
    pub cos_zenith: f64,
    pub cos_incidence: f64,
}

impl SolarGeometry {
    pub fn new(config: &Config, hour: u64, day_number: u64) -> Self {
        let equation_of_time = get_equation_of_time(day_number);
        let clock_time = get_clock_time(hour, config.start_time_of_day());
        let local_apparent_time =
            get_local_apparent_time(clock_time, &config.site, equation_of_time);
        let hour_angle = get_hour_angle(local_apparent_time);
        let declination = get_declination(day_number);

        SolarGeometry {
            day_number,
            extraterrestrial_radiation: get_extraterrestrial_radiation(
                config.solar_constant,
                day_number,
            ),
            equation_of_time,
            local_apparent_time,
            hour_angle,
            declination,
            cos_zenith: get_cos_zenith(declination, hour_angle, config.site.latitude),
            cos_incidence: get_cos_incidence(
                declination,
                hour_angle,
                config.site.latitude,
                &config.surface,
            ),
        }
    }

    pub fn zenith(&self) -> Angle {
        Angle::new::<radian>(self.cos_zenith.clamp(-1.0, 1.0).acos())
    }

    /// True when cos(zenith) was replaced by the floor value in divisions.
    /// Irradiance computed for such hours is not physically meaningful.
    pub fn is_zenith_clamped(&self) -> bool {
        self.cos_zenith <= COS_ZENITH_FLOOR
    }
}

/// Converts hourly horizontal irradiance records to irradiance on the
/// configured tilted surface. Holds only immutable configuration, so a single
/// instance can be shared between threads.
pub struct Transform {
    config: Config,
    days: Box<dyn DayMapping>,
}

impl Transform {
    /// Uses the day mapping implied by the configuration.
    pub fn new(config: Config) -> Self {
        let days = config.day_mapping();
        Transform { config, days }
    }

    pub fn with_day_mapping<D: DayMapping + 'static>(config: Config, days: D) -> Self {
        Transform {
            config,
            days: Box::new(days),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self, hour: u64) -> SolarGeometry {
        SolarGeometry::new(&self.config, hour, self.days.day_number(hour))
    }

    pub fn apply(&self, record: HourlyRecord) -> ComputedRecord {
        let geometry = self.geometry(record.hour);
        let beam = BeamIrradiance::new(
            record.global_horizontal,
            record.diffuse_horizontal,
            geometry.cos_zenith,
        );
        let factors = TiltFactors::new(
            geometry.cos_incidence,
            geometry.cos_zenith,
            &self.config.surface,
        );
        let tilted_irradiance = factors.apply(beam.horizontal, record.diffuse_horizontal);

        ComputedRecord {
            record,
            geometry,
            tilted_irradiance,
        }
    }

    /// Lazily transform a sequence of records, keeping their order.
    pub fn apply_all<'a, I>(&'a self, records: I) -> impl Iterator<Item = ComputedRecord> + 'a
    where
        I: IntoIterator<Item = HourlyRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().map(move |record| self.apply(record))
    }

    /// Transform records on the rayon thread pool. Collecting the returned
    /// iterator keeps the input order.
    pub fn apply_par(
        &self,
        records: Vec<HourlyRecord>,
    ) -> impl IndexedParallelIterator<Item = ComputedRecord> + '_ {
        records
            .into_par_iter()
            .map(move |record| self.apply(record))
    }
}

/// One-off transform of a single record using the default solar constant
/// and the `hour / 24` day numbering.
pub fn compute_tilted_irradiance(
    site: SiteConfig,
    surface: SurfaceConfig,
    record: HourlyRecord,
) -> ComputedRecord {
    Transform::with_day_mapping(Config::new(site, surface), HourIndexDays).apply(record)
}
