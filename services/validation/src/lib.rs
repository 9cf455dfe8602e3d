//! Strict, schema-first validation (spec §4.D).
//!
//! Every inbound record is checked against the invariants below before it
//! is allowed anywhere near the event bus or storage. Unlike a permissive
//! schema, unknown fields at the transport boundary are rejected by the
//! API layer's `serde(deny_unknown_fields)` structs — this crate owns the
//! semantic invariants (ranges, dates, known-unit membership).

use carbonledger_core::entities::{ActivityKind, IssueSeverity};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single validation failure, matching the original system's
/// `ValidationIssue` pydantic model one field at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub field: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl ValidationIssue {
    fn error(code: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            field: field.to_string(),
            message: message.into(),
            severity: IssueSeverity::Error,
        }
    }
}

/// The known unit vocabulary for energy and volume inputs (spec §4.C's
/// "unit policy"). An unknown unit is a validation error, never a
/// provider-level runtime error.
pub fn known_units_for(kind: ActivityKind) -> &'static [&'static str] {
    match kind {
        ActivityKind::Electricity => &["kWh", "MWh", "GJ", "Wh"],
        ActivityKind::NaturalGas => &["m3", "l", "gal", "bbl"],
        ActivityKind::DieselFuel => &["l", "gal", "bbl", "m3"],
    }
}

fn unit_known(kind: ActivityKind, unit: &str) -> bool {
    known_units_for(kind)
        .iter()
        .any(|known| known.eq_ignore_ascii_case(unit))
}

/// A candidate activity record prior to scope derivation and persistence.
#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost: Option<Decimal>,
}

/// Validate a single activity row against the invariants of spec §4.D.
/// Collects every violation rather than stopping at the first, matching
/// the original's per-field pydantic error reporting.
pub fn validate_activity(input: &ActivityInput, today: NaiveDate) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if input.quantity <= Decimal::ZERO {
        issues.push(ValidationIssue::error(
            "quantity_not_positive",
            "quantity",
            "Miktar pozitif olmalıdır",
        ));
    }

    if !unit_known(input.activity_kind, &input.unit) {
        issues.push(ValidationIssue::error(
            "unknown_unit",
            "unit",
            format!(
                "'{}' is not a known unit for {}",
                input.unit,
                input.activity_kind.as_str()
            ),
        ));
    }

    if input.start_date > input.end_date {
        issues.push(ValidationIssue::error(
            "start_after_end",
            "start_date",
            "Bitiş tarihi başlangıç tarihinden önce olamaz",
        ));
    }

    if input.end_date > today {
        issues.push(ValidationIssue::error(
            "future_dated",
            "end_date",
            "Gelecek tarihli veri girilemez",
        ));
    }

    if let Some(cost) = input.cost {
        if cost < Decimal::ZERO {
            issues.push(ValidationIssue::error(
                "negative_cost",
                "cost",
                "cost must be non-negative",
            ));
        }
    }

    issues
}

/// Surface area, when present, must be strictly positive.
pub fn validate_surface_area(area: Option<Decimal>) -> Vec<ValidationIssue> {
    match area {
        Some(value) if value <= Decimal::ZERO => vec![ValidationIssue::error(
            "surface_area_not_positive",
            "surface_area_m2",
            "surface_area_m2 must be greater than zero",
        )],
        _ => Vec::new(),
    }
}

/// Minimal syntactic email check: one '@', a non-empty local part, and a
/// domain part containing at least one '.'.
pub fn validate_email(email: &str) -> Vec<ValidationIssue> {
    let parts: Vec<&str> = email.splitn(2, '@').collect();
    let valid = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');

    if valid {
        Vec::new()
    } else {
        vec![ValidationIssue::error(
            "invalid_email",
            "email",
            "email is not syntactically valid",
        )]
    }
}

/// Passwords must be 8-72 characters (spec §4.D).
pub fn validate_password(password: &str) -> Vec<ValidationIssue> {
    let len = password.chars().count();
    if (8..=72).contains(&len) {
        Vec::new()
    } else {
        vec![ValidationIssue::error(
            "invalid_password_length",
            "password",
            "password must be between 8 and 72 characters",
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_negative_quantity() {
        let input = ActivityInput {
            activity_kind: ActivityKind::Electricity,
            quantity: Decimal::new(-5, 0),
            unit: "kWh".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            cost: None,
        };
        let issues = validate_activity(&input, date(2024, 2, 1));
        assert!(issues.iter().any(|i| i.code == "quantity_not_positive"));
    }

    #[test]
    fn rejects_future_end_date() {
        let input = ActivityInput {
            activity_kind: ActivityKind::Electricity,
            quantity: Decimal::new(100, 0),
            unit: "kWh".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2030, 1, 1),
            cost: None,
        };
        let issues = validate_activity(&input, date(2024, 2, 1));
        assert!(issues.iter().any(|i| i.code == "future_dated"));
    }

    #[test]
    fn rejects_unknown_unit() {
        let input = ActivityInput {
            activity_kind: ActivityKind::Electricity,
            quantity: Decimal::new(100, 0),
            unit: "barrels_of_monkeys".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            cost: None,
        };
        let issues = validate_activity(&input, date(2024, 2, 1));
        assert!(issues.iter().any(|i| i.code == "unknown_unit"));
    }

    #[test]
    fn accepts_valid_activity() {
        let input = ActivityInput {
            activity_kind: ActivityKind::NaturalGas,
            quantity: Decimal::new(1500, 0),
            unit: "m3".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            cost: Some(Decimal::new(500, 0)),
        };
        assert!(validate_activity(&input, date(2024, 2, 1)).is_empty());
    }

    #[test]
    fn validates_email_syntax() {
        assert!(validate_email("a@x.io").is_empty());
        assert!(!validate_email("not-an-email").is_empty());
        assert!(!validate_email("a@").is_empty());
    }

    #[test]
    fn validates_password_length() {
        assert!(validate_password("Pa$$w0rd1").is_empty());
        assert!(!validate_password("short").is_empty());
    }
}
