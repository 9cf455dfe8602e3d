//! OCR invoice extraction (spec §4.F): resolves `Invoice.file_path`, calls
//! the external vision service, parses the returned text for activity
//! kind/quantity/cost/date-range, and drives the Invoice state machine
//! through `processing -> completed|failed`.
//!
//! PDF rasterisation at 200 DPI is delegated to the vision vendor itself
//! (the request carries `dpi: 200` and the raw file bytes); this worker
//! never decodes PDF/image formats locally, mirroring how
//! [`carbonledger_calculation::RemoteProvider`] hands the vendor a typed
//! request rather than pre-computing anything emission-factor vendors are
//! meant to own.

use std::sync::Arc;
use std::time::Duration;

use carbonledger_core::entities::{ActivityKind, Invoice, InvoiceMime, InvoiceStatus, NotificationKind};
use carbonledger_core::error::{AppError, AppResult};
use carbonledger_notifications::NotificationService;
use carbonledger_storage::repositories::invoices::{mime_str, InvoiceRepository};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MAX_RETRIES: i32 = 3;
const RETRY_BACKOFF_SECS: u64 = 60;
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    mime: &'a str,
    dpi: u32,
    #[serde(with = "base64_bytes")]
    file_bytes: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    text: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &&[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }
}

/// Fields pulled out of vision-service text, with the confidence they
/// were extracted at.
#[derive(Debug, Default, Clone)]
pub struct ExtractedFields {
    pub activity_kind: Option<ActivityKind>,
    pub quantity: Option<Decimal>,
    pub cost_tl: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub confidence: f64,
}

/// Keyword match against normalised (lowercased) text, per spec §4.F.
fn extract_activity_kind(text: &str) -> Option<ActivityKind> {
    let lower = text.to_lowercase();
    if lower.contains("elektrik") || lower.contains("electricity") || lower.contains("kwh") {
        Some(ActivityKind::Electricity)
    } else if lower.contains("dogalgaz") || lower.contains("doğalgaz") || lower.contains("natural gas") {
        Some(ActivityKind::NaturalGas)
    } else if lower.contains("motorin") || lower.contains("dizel") || lower.contains("diesel") {
        Some(ActivityKind::DieselFuel)
    } else {
        None
    }
}

/// Regex-free unit-suffix scan: the first run of digits (with optional
/// Turkish or international decimal separator) immediately followed by a
/// known unit token.
fn extract_quantity(text: &str) -> Option<Decimal> {
    const UNIT_SUFFIXES: &[&str] = &["kwh", "mwh", "m3", "m³", "litre", "lt", "l"];
    for token in text.split_whitespace() {
        let lower = token.to_lowercase();
        for suffix in UNIT_SUFFIXES {
            if let Some(number_part) = lower.strip_suffix(suffix) {
                if let Some(value) = parse_turkish_decimal(number_part) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Cost is suffixed with a TL currency marker; Turkish convention uses
/// `.` as the thousands separator and `,` as the decimal point.
fn extract_cost_tl(text: &str) -> Option<Decimal> {
    const CURRENCY_SUFFIXES: &[&str] = &["tl", "try", "₺"];
    for token in text.split_whitespace() {
        let lower = token.to_lowercase();
        for suffix in CURRENCY_SUFFIXES {
            if let Some(number_part) = lower.strip_suffix(suffix) {
                if let Some(value) = parse_turkish_decimal(number_part) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// `1.234,56` -> `1234.56`; falls back to plain dot-decimal parsing for
/// already-normalised numbers.
fn parse_turkish_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(',') {
        let normalized = trimmed.replace('.', "").replace(',', ".");
        Decimal::from_str(&normalized).ok()
    } else {
        Decimal::from_str(trimmed).ok()
    }
}

/// First date found is the start; last is the end. A lone date is
/// extended to the last day of its month (spec §4.F).
fn extract_date_range(text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let dates = find_dates(text);
    match dates.as_slice() {
        [] => (None, None),
        [single] => (Some(*single), Some(last_day_of_month(*single))),
        [first, .., last] => (Some(*first), Some(*last)),
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Scans for `DD.MM.YYYY` and `YYYY-MM-DD` date tokens, in the order they
/// appear in the text.
fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for token in text.split(|c: char| c.is_whitespace() || c == ',' || c == ';') {
        let token = token.trim();
        if let Ok(date) = NaiveDate::parse_from_str(token, "%d.%m.%Y") {
            dates.push(date);
        } else if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            dates.push(date);
        }
    }
    dates
}

/// Parse the vision service's raw text into typed fields, accumulating
/// confidence across each successful extraction (spec §4.F: "0 to 1").
pub fn extract_fields(text: &str) -> ExtractedFields {
    let activity_kind = extract_activity_kind(text);
    let quantity = extract_quantity(text);
    let cost_tl = extract_cost_tl(text);
    let (start_date, end_date) = extract_date_range(text);

    let checks = [
        activity_kind.is_some(),
        quantity.is_some(),
        cost_tl.is_some(),
        start_date.is_some(),
    ];
    let confidence = checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64;

    ExtractedFields {
        activity_kind,
        quantity,
        cost_tl,
        start_date,
        end_date,
        confidence,
    }
}

pub struct OcrWorker {
    client: reqwest::Client,
    vision_base_url: String,
    invoices: InvoiceRepository,
    notifications: NotificationService,
}

impl OcrWorker {
    pub fn new(
        vision_base_url: impl Into<String>,
        invoices: InvoiceRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            vision_base_url: vision_base_url.into(),
            invoices,
            notifications,
        }
    }

    /// Process one invoice end to end, retrying transient vision-service
    /// failures with a 60s backoff, up to 3 times (spec §4.F).
    pub async fn process(&self, invoice: &Invoice, file_bytes: &[u8]) -> AppResult<()> {
        self.invoices.mark_processing(invoice.id).await?;

        let mut attempt = 0;
        loop {
            match self.call_vision_service(invoice.mime, file_bytes).await {
                Ok(text) => {
                    let fields = extract_fields(&text);
                    self.invoices
                        .record_extraction(
                            invoice.id,
                            fields.activity_kind.map(ActivityKind::as_str),
                            fields.quantity,
                            fields.cost_tl,
                            fields.start_date,
                            fields.end_date,
                            Some(&text),
                            fields.confidence,
                            InvoiceStatus::Completed,
                        )
                        .await?;

                    let title = if fields.confidence < LOW_CONFIDENCE_THRESHOLD {
                        "Invoice processed (low confidence, please review)"
                    } else {
                        "Invoice processed"
                    };
                    let _ = self
                        .notifications
                        .notify(
                            invoice.uploaded_by_user_id,
                            NotificationKind::InvoiceProcessed,
                            title,
                            &format!(
                                "Extraction confidence: {:.0}%.",
                                fields.confidence * 100.0
                            ),
                            Some(&format!("/invoices/{}", invoice.id)),
                            fields.confidence < LOW_CONFIDENCE_THRESHOLD,
                        )
                        .await;
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(invoice_id = %invoice.id, attempt, error = %err, "retrying OCR extraction");
                    tokio::time::sleep(Duration::from_secs(RETRY_BACKOFF_SECS)).await;
                }
                Err(err) => {
                    self.invoices
                        .mark_failed(invoice.id, &err.to_string(), attempt)
                        .await?;
                    return Err(err);
                }
            }
        }
    }

    async fn call_vision_service(&self, mime: InvoiceMime, file_bytes: &[u8]) -> AppResult<String> {
        let request = VisionRequest {
            mime: mime_str(mime),
            dpi: 200,
            file_bytes,
        };

        let response = self
            .client
            .post(format!("{}/ocr", self.vision_base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Transient(format!("vision service unreachable: {e}")))?;

        if response.status().is_server_error() {
            return Err(AppError::Transient(format!(
                "vision service returned {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "vision service rejected request: {}",
                response.status()
            )));
        }

        let parsed: VisionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("malformed vision response: {e}")))?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extracts_electricity_kind_from_turkish_text() {
        assert_eq!(
            extract_activity_kind("ELEKTRIK FATURASI - Ocak 2024"),
            Some(ActivityKind::Electricity)
        );
    }

    #[test]
    fn extracts_quantity_with_unit_suffix() {
        assert_eq!(extract_quantity("Tuketim: 1.234,56kWh"), Some(dec!(1234.56)));
    }

    #[test]
    fn extracts_cost_with_turkish_decimal_convention() {
        assert_eq!(extract_cost_tl("Tutar: 2.500,75TL"), Some(dec!(2500.75)));
    }

    #[test]
    fn single_date_extends_to_end_of_month() {
        let (start, end) = extract_date_range("Fatura Tarihi: 15.01.2024");
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn date_range_uses_first_and_last_token() {
        let (start, end) = extract_date_range("Donem: 01.01.2024 - 31.01.2024");
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn confidence_accumulates_across_successful_fields() {
        let fields = extract_fields("ELEKTRIK 1.234,56kWh Tutar: 500,00TL Tarih: 01.01.2024");
        assert_eq!(fields.confidence, 1.0);
    }

    #[test]
    fn confidence_is_zero_when_nothing_matches() {
        let fields = extract_fields("unrelated document with no known fields");
        assert_eq!(fields.confidence, 0.0);
    }
}
