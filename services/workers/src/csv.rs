//! CSV batch ingestion (spec §4.E): the exact header set
//! `aktivite_tipi,miktar,birim,baslangic_tarihi,bitis_tarihi`, UTF-8 with
//! optional BOM, `YYYY-MM-DD` dates, comma-or-dot decimals, and a
//! per-kind synonym map. File limit is enforced by the API layer (5 MiB);
//! this module only parses and validates rows.

use carbonledger_core::entities::ActivityKind;
use carbonledger_validation::{validate_activity, ActivityInput, ValidationIssue};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

pub const REQUIRED_HEADER: &[&str] = &[
    "aktivite_tipi",
    "miktar",
    "birim",
    "baslangic_tarihi",
    "bitis_tarihi",
];

pub const MAX_FILE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Per-kind synonym map for the `aktivite_tipi` column (spec §4.E).
fn resolve_activity_kind(raw: &str) -> Option<ActivityKind> {
    match raw.trim().to_lowercase().as_str() {
        "elektrik" | "electricity" => Some(ActivityKind::Electricity),
        "dogalgaz" | "doğalgaz" | "natural_gas" => Some(ActivityKind::NaturalGas),
        "dizel" | "motorin" | "mazot" | "diesel_fuel" => Some(ActivityKind::DieselFuel),
        _ => None,
    }
}

/// Accepts comma or dot as the decimal separator.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvRowResult {
    pub row_number: usize,
    pub success: bool,
    pub activity_kind: Option<ActivityKind>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvUploadOutcome {
    pub total_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub results: Vec<CsvRowResult>,
    pub message: String,
}

/// Strip a UTF-8 BOM if present.
fn strip_bom(bytes: &[u8]) -> &[u8] {
    const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
    bytes.strip_prefix(BOM).unwrap_or(bytes)
}

/// Parse and validate every row. Commit policy is partial-success: the
/// caller commits the rows that validated even if others failed, and
/// returns per-row results regardless.
pub fn parse_and_validate(raw: &[u8], today: NaiveDate) -> Result<CsvUploadOutcome, ValidationIssue> {
    let bytes = strip_bom(raw);
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);

    {
        let headers = reader.headers().map_err(|e| ValidationIssue {
            code: "malformed_csv".into(),
            field: "file".into(),
            message: format!("could not read CSV header: {e}"),
            severity: carbonledger_core::entities::IssueSeverity::Error,
        })?;
        let header_names: Vec<&str> = headers.iter().collect();
        if header_names != REQUIRED_HEADER {
            return Err(ValidationIssue {
                code: "unexpected_header".into(),
                field: "file".into(),
                message: format!(
                    "expected header {:?}, got {:?}",
                    REQUIRED_HEADER, header_names
                ),
                severity: carbonledger_core::entities::IssueSeverity::Error,
            });
        }
    }

    let mut results = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row_number = index + 2; // header is row 1
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                results.push(CsvRowResult {
                    row_number,
                    success: false,
                    activity_kind: None,
                    quantity: None,
                    unit: None,
                    start_date: None,
                    end_date: None,
                    error: Some(format!("malformed row: {e}")),
                });
                continue;
            }
        };
        results.push(validate_row(row_number, &record, today));
    }

    let successful_rows = results.iter().filter(|r| r.success).count();
    let failed_rows = results.len() - successful_rows;

    Ok(CsvUploadOutcome {
        total_rows: results.len(),
        successful_rows,
        failed_rows,
        message: format!(
            "{successful_rows} of {} rows processed successfully",
            results.len()
        ),
        results,
    })
}

fn validate_row(row_number: usize, record: &csv::StringRecord, today: NaiveDate) -> CsvRowResult {
    let get = |i: usize| record.get(i).unwrap_or_default();

    let Some(activity_kind) = resolve_activity_kind(get(0)) else {
        return failed(row_number, format!("unknown activity type '{}'", get(0)));
    };
    let Some(quantity) = parse_decimal(get(1)) else {
        return failed(row_number, format!("could not parse quantity '{}'", get(1)));
    };
    let unit = get(2).trim().to_string();
    let Ok(start_date) = NaiveDate::parse_from_str(get(3).trim(), "%Y-%m-%d") else {
        return failed(row_number, format!("could not parse baslangic_tarihi '{}'", get(3)));
    };
    let Ok(end_date) = NaiveDate::parse_from_str(get(4).trim(), "%Y-%m-%d") else {
        return failed(row_number, format!("could not parse bitis_tarihi '{}'", get(4)));
    };

    let issues = validate_activity(
        &ActivityInput {
            activity_kind,
            quantity,
            unit: unit.clone(),
            start_date,
            end_date,
            cost: None,
        },
        today,
    );

    if let Some(first) = issues.first() {
        return failed(row_number, first.message.clone());
    }

    CsvRowResult {
        row_number,
        success: true,
        activity_kind: Some(activity_kind),
        quantity: Some(quantity),
        unit: Some(unit),
        start_date: Some(start_date),
        end_date: Some(end_date),
        error: None,
    }
}

fn failed(row_number: usize, message: String) -> CsvRowResult {
    CsvRowResult {
        row_number,
        success: false,
        activity_kind: None,
        quantity: None,
        unit: None,
        start_date: None,
        end_date: None,
        error: Some(message),
    }
}

/// The template downloadable from `/csv-template/activity-data` (spec §6).
/// Re-uploading it unmodified must yield a row count equal to its
/// data-line count and zero failures (spec §8's round-trip law).
pub fn template_csv() -> String {
    let mut out = String::new();
    out.push_str(&REQUIRED_HEADER.join(","));
    out.push('\n');
    out.push_str("elektrik,1500,kWh,2024-01-01,2024-01-31\n");
    out.push_str("dogalgaz,320,m3,2024-01-01,2024-01-31\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_with_zero_failures() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let template = template_csv();
        let data_lines = template.lines().count() - 1;
        let outcome = parse_and_validate(template.as_bytes(), today).unwrap();
        assert_eq!(outcome.total_rows, data_lines);
        assert_eq!(outcome.failed_rows, 0);
    }

    #[test]
    fn a_negative_quantity_row_fails_while_others_succeed() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let csv = "aktivite_tipi,miktar,birim,baslangic_tarihi,bitis_tarihi\n\
                   elektrik,100,kWh,2024-01-01,2024-01-31\n\
                   elektrik,-5,kWh,2024-01-01,2024-01-31\n\
                   dogalgaz,50,m3,2024-01-01,2024-01-31\n";
        let outcome = parse_and_validate(csv.as_bytes(), today).unwrap();
        assert_eq!(outcome.total_rows, 3);
        assert_eq!(outcome.successful_rows, 2);
        assert_eq!(outcome.failed_rows, 1);
        assert!(!outcome.results[1].success);
    }

    #[test]
    fn decimal_comma_separator_is_accepted() {
        assert_eq!(parse_decimal("12,5"), Decimal::from_str("12.5").ok());
        assert_eq!(parse_decimal("12.5"), Decimal::from_str("12.5").ok());
    }

    #[test]
    fn unexpected_header_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let csv = "type,amount,unit,start,end\nelectricity,1,kWh,2024-01-01,2024-01-02\n";
        assert!(parse_and_validate(csv.as_bytes(), today).is_err());
    }

    #[test]
    fn bom_prefixed_file_still_parses() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(template_csv().as_bytes());
        let outcome = parse_and_validate(&bytes, today).unwrap();
        assert_eq!(outcome.failed_rows, 0);
    }
}
