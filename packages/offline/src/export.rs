//! CSV report export with the fixed operator-facing column order.
//!
//! Values containing commas or quotes are quoted (the writer's default
//! quoting rules). Dates and times are rendered in the operator's
//! configured offset.

use chrono::FixedOffset;
use rescue_map_models::{MISSING_LABEL, Snapshot, ViewSet};

use crate::OfflineError;

/// Fixed column order of the exported report.
pub const REPORT_HEADERS: [&str; 9] = [
    "ID",
    "Tipo",
    "Estado",
    "Usuario",
    "Unidad",
    "Fecha",
    "Hora",
    "Latitud",
    "Longitud",
];

/// Date rendering format (`%d/%m/%Y`).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Time rendering format (`%H:%M:%S`).
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Renders a view set as a CSV report.
///
/// The snapshot supplies type labels and unit names; absent optional
/// values render as `N/A` (coordinates as empty fields).
///
/// # Errors
///
/// Returns [`OfflineError`] if writing the CSV fails.
pub fn export_report(
    view: &ViewSet,
    snapshot: &Snapshot,
    tz: FixedOffset,
) -> Result<String, OfflineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADERS)?;

    for incident in &view.incidents {
        let local = incident.timestamp.with_timezone(&tz);
        let reporter = incident
            .reporter
            .as_ref()
            .map_or(MISSING_LABEL, |reporter| reporter.name.as_str());
        let unit = incident
            .assigned_unit
            .and_then(|unit_id| snapshot.unit(unit_id))
            .map_or(MISSING_LABEL, |unit| unit.name.as_str());
        let (lat, lon) = incident.coordinate.map_or_else(
            || (String::new(), String::new()),
            |coordinate| (coordinate.lat.to_string(), coordinate.lon.to_string()),
        );
        let id = incident.id.to_string();
        let status = incident.status.to_string();
        let date = local.format(DATE_FORMAT).to_string();
        let time = local.format(TIME_FORMAT).to_string();

        writer.write_record([
            id.as_str(),
            snapshot.type_label(incident),
            status.as_str(),
            reporter,
            unit,
            date.as_str(),
            time.as_str(),
            lat.as_str(),
            lon.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
