#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Offline CSV report ingestion and export.
//!
//! Two distinct, explicit formats:
//!
//! * the **offline report schema** — header
//!   `id,tipo_accidente,timestamp,latitud,longitud,estado,unidad` with
//!   epoch-second timestamps and pipe-separated unit names, ingested
//!   with [`parse_report_csv`];
//! * the **exported report schema** — fixed columns
//!   `ID,Tipo,Estado,Usuario,Unidad,Fecha,Hora,Latitud,Longitud`,
//!   produced by [`export::export_report`] and re-ingested with
//!   [`parse_exported_report`].
//!
//! Rows that fail validation are dropped silently row-by-row; ingestion
//! continues and the accepted/dropped counts are reported.

pub mod export;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rescue_map_models::{IncidentStatus, MISSING_LABEL};
use std::str::FromStr as _;

/// Default status for rows whose `estado` field is empty.
pub const DEFAULT_STATUS: &str = "accidente";

/// Errors for offline report handling.
///
/// Malformed *rows* are not errors — they are dropped and counted.
/// These are structural failures only.
#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    /// The CSV reader could not process the input.
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    /// The header row lacks a required column.
    #[error("missing column `{name}` in report header")]
    MissingColumn {
        /// The absent column name.
        name: String,
    },

    /// Writing the export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The generated export was not valid UTF-8.
    #[error("generated report was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One incident row from an offline report.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineIncident {
    /// Row identifier, never empty.
    pub id: String,
    /// Raw type field: a numeric code in the offline schema, a
    /// displayed label in the exported schema.
    pub type_code: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Latitude; 0.0 when absent or unparseable.
    pub lat: f64,
    /// Longitude; 0.0 when absent or unparseable.
    pub lon: f64,
    /// Raw status string; unknown values pass through untouched.
    pub status: String,
    /// Assigned unit names (pipe-separated in the offline schema).
    pub units: Vec<String>,
}

impl OfflineIncident {
    /// The parsed status, when the raw string is one of the known
    /// labels (`accidente`, `en_camino`, `atendido`, `resuelto`).
    #[must_use]
    pub fn status(&self) -> Option<IncidentStatus> {
        IncidentStatus::from_str(&self.status).ok()
    }

    /// Displayed label for the numeric type code.
    #[must_use]
    pub fn type_label(&self) -> &str {
        translate_type(&self.type_code)
    }
}

/// Result of ingesting one offline report.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineIngest {
    /// Rows that parsed and validated.
    pub incidents: Vec<OfflineIncident>,
    /// Count of accepted rows (`incidents.len()`).
    pub accepted: usize,
    /// Count of rows dropped for failing validation.
    pub dropped: usize,
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, OfflineError> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
        .ok_or_else(|| OfflineError::MissingColumn {
            name: name.to_owned(),
        })
}

fn field<'a>(record: &'a csv::StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("")
}

fn split_units(raw: &str) -> Vec<String> {
    raw.split('|')
        .filter(|name| !name.is_empty() && *name != MISSING_LABEL)
        .map(str::to_owned)
        .collect()
}

/// Parses an offline report
/// (`id,tipo_accidente,timestamp,latitud,longitud,estado,unidad`).
///
/// Rows with an empty `id` or a non-numeric `timestamp` are dropped
/// silently and counted; a trailing blank line is tolerated. An empty
/// `estado` defaults to [`DEFAULT_STATUS`].
///
/// # Errors
///
/// Returns [`OfflineError`] if the input has no usable header row or a
/// required column is missing.
pub fn parse_report_csv(text: &str) -> Result<OfflineIngest, OfflineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let id_col = column(&headers, "id")?;
    let type_col = column(&headers, "tipo_accidente")?;
    let ts_col = column(&headers, "timestamp")?;
    let lat_col = column(&headers, "latitud")?;
    let lon_col = column(&headers, "longitud")?;
    let status_col = column(&headers, "estado")?;
    let units_col = column(&headers, "unidad")?;

    let mut incidents = Vec::new();
    let mut dropped = 0_usize;
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                log::debug!("dropping unreadable report row: {err}");
                dropped += 1;
                continue;
            }
        };

        let id = field(&record, id_col);
        if id.is_empty() {
            log::debug!("dropping report row without id");
            dropped += 1;
            continue;
        }
        let Some(timestamp) = field(&record, ts_col)
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            log::debug!("dropping report row {id}: non-numeric timestamp");
            dropped += 1;
            continue;
        };

        let status = field(&record, status_col);
        incidents.push(OfflineIncident {
            id: id.to_owned(),
            type_code: field(&record, type_col).to_owned(),
            timestamp,
            lat: field(&record, lat_col).parse().unwrap_or(0.0),
            lon: field(&record, lon_col).parse().unwrap_or(0.0),
            status: if status.is_empty() {
                DEFAULT_STATUS.to_owned()
            } else {
                status.to_owned()
            },
            units: split_units(field(&record, units_col)),
        });
    }

    let accepted = incidents.len();
    log::info!("offline report ingested: {accepted} rows accepted, {dropped} dropped");
    Ok(OfflineIngest {
        incidents,
        accepted,
        dropped,
    })
}

/// Parses a previously exported report
/// (`ID,Tipo,Estado,Usuario,Unidad,Fecha,Hora,Latitud,Longitud`).
///
/// `Fecha`/`Hora` were rendered in the operator's offset, so the same
/// `tz` is needed to rebuild timestamps. Rows with unparseable dates or
/// an empty `ID` are dropped and counted, like in [`parse_report_csv`].
///
/// # Errors
///
/// Returns [`OfflineError`] if a required column is missing from the
/// header.
pub fn parse_exported_report(text: &str, tz: FixedOffset) -> Result<OfflineIngest, OfflineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let id_col = column(&headers, "ID")?;
    let type_col = column(&headers, "Tipo")?;
    let status_col = column(&headers, "Estado")?;
    let units_col = column(&headers, "Unidad")?;
    let date_col = column(&headers, "Fecha")?;
    let time_col = column(&headers, "Hora")?;
    let lat_col = column(&headers, "Latitud")?;
    let lon_col = column(&headers, "Longitud")?;

    let mut incidents = Vec::new();
    let mut dropped = 0_usize;
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                log::debug!("dropping unreadable report row: {err}");
                dropped += 1;
                continue;
            }
        };

        let id = field(&record, id_col);
        let date = NaiveDate::parse_from_str(field(&record, date_col), export::DATE_FORMAT);
        let time = NaiveTime::parse_from_str(field(&record, time_col), export::TIME_FORMAT);
        let (Ok(date), Ok(time)) = (date, time) else {
            log::debug!("dropping exported row {id}: unparseable date or time");
            dropped += 1;
            continue;
        };
        if id.is_empty() {
            log::debug!("dropping exported row without id");
            dropped += 1;
            continue;
        }
        let Some(local) = date.and_time(time).and_local_timezone(tz).single() else {
            dropped += 1;
            continue;
        };

        let status = field(&record, status_col);
        incidents.push(OfflineIncident {
            id: id.to_owned(),
            type_code: field(&record, type_col).to_owned(),
            timestamp: local.with_timezone(&Utc),
            lat: field(&record, lat_col).parse().unwrap_or(0.0),
            lon: field(&record, lon_col).parse().unwrap_or(0.0),
            status: if status.is_empty() {
                DEFAULT_STATUS.to_owned()
            } else {
                status.to_owned()
            },
            units: split_units(field(&record, units_col)),
        });
    }

    let accepted = incidents.len();
    Ok(OfflineIngest {
        incidents,
        accepted,
        dropped,
    })
}

/// Displayed label for an offline numeric type code.
#[must_use]
pub fn translate_type(code: &str) -> &str {
    match code {
        "1" => "Colisión",
        "2" => "Incendio",
        "3" => "Derrumbe",
        "4" => "Inundación",
        "5" => "Otro",
        _ => "Desconocido",
    }
}

/// Displayed label for an offline status string; unknown values pass
/// through untouched.
#[must_use]
pub fn translate_status(estado: &str) -> &str {
    match estado {
        "accidente" => "Activa",
        "en_camino" => "En Camino",
        "resuelto" | "atendido" => "Resuelta",
        other => other,
    }
}
