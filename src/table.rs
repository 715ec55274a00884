use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, Trim};
use uom::si::heat_flux_density::watt_per_square_meter;

use crate::error::{RecordError, TableError};
use crate::records::{ComputedRecord, HourlyRecord};

pub const HOUR_COLUMN: &str = "Hour";
pub const GHI_COLUMN: &str = "GHI";
pub const DHI_COLUMN: &str = "DHI";
pub const IT_COLUMN: &str = "IT";

/// Positions of the columns the transform needs. Everything else is passed through.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Layout {
    hour: usize,
    ghi: usize,
    dhi: usize,
    passthrough: Vec<usize>,
}

impl Layout {
    fn from_headers(headers: &StringRecord) -> Result<Self, RecordError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or(RecordError::MissingColumn(name))
        };
        let hour = find(HOUR_COLUMN)?;
        let ghi = find(GHI_COLUMN)?;
        let dhi = find(DHI_COLUMN)?;
        let passthrough = (0..headers.len())
            .filter(|i| ![hour, ghi, dhi].contains(i))
            .collect();
        Ok(Layout {
            hour,
            ghi,
            dhi,
            passthrough,
        })
    }
}

/// Reads hourly records from a CSV table with a header row.
#[derive(Debug)]
pub struct TableReader<R> {
    reader: csv::Reader<R>,
    layout: Layout,
    passthrough_headers: Vec<String>,
}

impl TableReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
        Ok(Self::new(file)?)
    }
}

impl<R: io::Read> TableReader<R> {
    pub fn new(input: R) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(input);
        let headers = reader.headers()?.clone();
        let layout = Layout::from_headers(&headers)?;
        let passthrough_headers = layout
            .passthrough
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();
        Ok(TableReader {
            reader,
            layout,
            passthrough_headers,
        })
    }

    /// Names of the columns carried through unchanged, in input order.
    /// Header names are trimmed, passthrough values are not.
    pub fn passthrough_headers(&self) -> &[String] {
        &self.passthrough_headers
    }

    /// Lazily parse the data rows. Each malformed row yields its own error,
    /// the caller decides whether to skip it or stop.
    pub fn records(&mut self) -> impl Iterator<Item = Result<HourlyRecord, TableError>> + '_ {
        let layout = &self.layout;
        self.reader.records().map(move |row| {
            let row = row?;
            Ok(parse_row(layout, &row)?)
        })
    }
}

fn parse_row(layout: &Layout, row: &StringRecord) -> Result<HourlyRecord, RecordError> {
    let line = row.position().map_or(0, |position| position.line());

    let hour = parse_number(row, layout.hour, HOUR_COLUMN, line)?;
    // Hours may come as "12.0" from tools that store every column as float
    if hour < 0.0 || hour.fract() != 0.0 || hour >= u64::MAX as f64 {
        return Err(RecordError::InvalidHour { line, value: hour });
    }

    let ghi = parse_number(row, layout.ghi, GHI_COLUMN, line)?;
    let dhi = parse_number(row, layout.dhi, DHI_COLUMN, line)?;

    let passthrough = layout
        .passthrough
        .iter()
        .map(|&i| row.get(i).unwrap_or_default().to_string())
        .collect();

    Ok(HourlyRecord::new(hour as u64, ghi, dhi).with_passthrough(passthrough))
}

fn parse_number(
    row: &StringRecord,
    index: usize,
    column: &'static str,
    line: u64,
) -> Result<f64, RecordError> {
    let text = row.get(index).unwrap_or_default().trim();
    if text.is_empty() {
        return Err(RecordError::Empty { line, column });
    }
    let value: f64 = text.parse().map_err(|_| RecordError::NotNumeric {
        line,
        column,
        value: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(RecordError::NotFinite {
            line,
            column,
            value,
        });
    }
    Ok(value)
}

/// Writes computed records as `Hour, GHI, DHI, <passthrough columns>, IT`.
pub struct TableWriter<W: io::Write> {
    writer: csv::Writer<W>,
}

impl TableWriter<File> {
    pub fn from_path<P: AsRef<Path>>(path: P, passthrough_headers: &[String]) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
        Ok(Self::new(file, passthrough_headers)?)
    }
}

impl<W: io::Write> TableWriter<W> {
    pub fn new(output: W, passthrough_headers: &[String]) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(
            [HOUR_COLUMN, GHI_COLUMN, DHI_COLUMN]
                .into_iter()
                .chain(passthrough_headers.iter().map(String::as_str))
                .chain([IT_COLUMN]),
        )?;
        Ok(TableWriter { writer })
    }

    pub fn write(&mut self, computed: &ComputedRecord) -> Result<(), csv::Error> {
        let record = &computed.record;
        let mut fields = vec![
            record.hour.to_string(),
            record
                .global_horizontal
                .get::<watt_per_square_meter>()
                .to_string(),
            record
                .diffuse_horizontal
                .get::<watt_per_square_meter>()
                .to_string(),
        ];
        fields.extend(record.passthrough.iter().cloned());
        fields.push(
            computed
                .tilted_irradiance
                .get::<watt_per_square_meter>()
                .to_string(),
        );
        self.writer.write_record(&fields)
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> anyhow::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Could not flush output table: {}", e.error()))
    }
}
