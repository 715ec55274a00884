use std::fmt;

use itertools::Itertools;
use uom::si::{f64::HeatFluxDensity, heat_flux_density::watt_per_square_meter};

use crate::tools::sun::SolarGeometry;

/// One hourly measurement of horizontal irradiance.
#[derive(Clone, Debug, PartialEq)]
pub struct HourlyRecord {
    /// Hours since the start of the dataset
    pub hour: u64,
    /// GHI
    pub global_horizontal: HeatFluxDensity,
    /// DHI, expected to be at most GHI
    pub diffuse_horizontal: HeatFluxDensity,
    /// Remaining input columns (temperature, wind speed, ...) in input order,
    /// carried through untouched
    pub passthrough: Vec<String>,
}

impl HourlyRecord {
    /// Irradiance values in W/m^2
    pub fn new(hour: u64, global_horizontal: f64, diffuse_horizontal: f64) -> Self {
        HourlyRecord {
            hour,
            global_horizontal: HeatFluxDensity::new::<watt_per_square_meter>(global_horizontal),
            diffuse_horizontal: HeatFluxDensity::new::<watt_per_square_meter>(diffuse_horizontal),
            passthrough: Vec::new(),
        }
    }

    pub fn with_passthrough(mut self, passthrough: Vec<String>) -> Self {
        self.passthrough = passthrough;
        self
    }
}

/// An hourly record together with the irradiance on the tilted surface.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedRecord {
    pub record: HourlyRecord,
    /// Sun position used for the conversion; use it to filter out night hours
    pub geometry: SolarGeometry,
    /// IT
    pub tilted_irradiance: HeatFluxDensity,
}

impl ComputedRecord {
    /// Non-fatal problems with this hour. The transform produces a value
    /// regardless, but it should not be trusted when any of these are present.
    pub fn warnings(&self) -> impl Iterator<Item = DataQualityWarning> {
        let record = &self.record;
        let diffuse_exceeds_global = (record.diffuse_horizontal > record.global_horizontal)
            .then_some(DataQualityWarning::DiffuseExceedsGlobal {
                hour: record.hour,
                global: record.global_horizontal,
                diffuse: record.diffuse_horizontal,
            });
        let sun_below_horizon =
            self.geometry
                .is_zenith_clamped()
                .then_some(DataQualityWarning::ZenithClamped {
                    hour: record.hour,
                    cos_zenith: self.geometry.cos_zenith,
                });
        diffuse_exceeds_global.into_iter().chain(sun_below_horizon)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataQualityWarning {
    /// Physically invalid measurement, DHI > GHI
    DiffuseExceedsGlobal {
        hour: u64,
        global: HeatFluxDensity,
        diffuse: HeatFluxDensity,
    },
    /// The sun is at or below the horizon and cos(zenith) was replaced by its
    /// floor value
    ZenithClamped { hour: u64, cos_zenith: f64 },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::DiffuseExceedsGlobal {
                hour,
                global,
                diffuse,
            } => write!(
                f,
                "hour {hour}: diffuse irradiance {} W/m^2 exceeds global irradiance {} W/m^2",
                diffuse.get::<watt_per_square_meter>(),
                global.get::<watt_per_square_meter>()
            ),
            DataQualityWarning::ZenithClamped { hour, cos_zenith } => write!(
                f,
                "hour {hour}: sun below horizon (cos zenith = {cos_zenith:.6})"
            ),
        }
    }
}

/// Tally of data quality problems over a batch of records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QualityReport {
    pub records: usize,
    pub diffuse_exceeds_global: usize,
    pub zenith_clamped: usize,
    /// Rows whose hour index is lower than the one before
    pub out_of_order: usize,
}

impl QualityReport {
    pub fn add(&mut self, record: &ComputedRecord) {
        self.records += 1;
        for warning in record.warnings() {
            match warning {
                DataQualityWarning::DiffuseExceedsGlobal { .. } => {
                    self.diffuse_exceeds_global += 1
                }
                DataQualityWarning::ZenithClamped { .. } => self.zenith_clamped += 1,
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diffuse_exceeds_global == 0 && self.zenith_clamped == 0 && self.out_of_order == 0
    }
}

impl<'a> FromIterator<&'a ComputedRecord> for QualityReport {
    fn from_iter<I: IntoIterator<Item = &'a ComputedRecord>>(iter: I) -> Self {
        let mut report = QualityReport::default();
        for record in iter {
            report.add(record);
        }
        report
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} with DHI > GHI, {} with the sun below the horizon, {} out of order",
            self.records, self.diffuse_exceeds_global, self.zenith_clamped, self.out_of_order
        )
    }
}

/// Number of records whose hour index decreases relative to the previous one.
/// The transform doesn't depend on ordering, this only flags suspicious input.
pub fn count_out_of_order(records: &[HourlyRecord]) -> usize {
    records
        .iter()
        .tuple_windows()
        .filter(|(previous, current)| current.hour < previous.hour)
        .count()
}
