//! Domain entities (§3 of the specification).
//!
//! These mirror the relational schema one-for-one: every field here has a
//! column in `carbonledger-storage`'s migrations. Invariants that cannot be
//! expressed in the type system (e.g. "exactly one owner per company") are
//! enforced at the repository boundary, not here.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered platform user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// A tenant: the unit that owns facilities, members, and financial state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub tax_number: Option<String>,
    pub industry_type: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A physical site belonging to a `Company`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub facility_type: FacilityType,
    /// Heated/cooled floor area in square meters. Must be > 0 when present.
    pub surface_area_m2: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Production,
    Warehouse,
    Office,
    Retail,
    Other,
}

/// A user's membership in a company, with an optional facility restriction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    /// If set, this member may only act on this facility's data.
    pub facility_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    DataEntry,
    Admin,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Electricity,
    NaturalGas,
    DieselFuel,
}

impl ActivityKind {
    /// GHG Protocol scope derivation: electricity is Scope 2, combustion is Scope 1.
    pub fn derived_scope(self) -> Scope {
        match self {
            ActivityKind::Electricity => Scope::Scope2,
            ActivityKind::NaturalGas | ActivityKind::DieselFuel => Scope::Scope1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Electricity => "electricity",
            ActivityKind::NaturalGas => "natural_gas",
            ActivityKind::DieselFuel => "diesel_fuel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Scope1,
    Scope2,
    Scope3,
}

/// A single reported activity period for a facility (an electricity bill,
/// a tank of diesel, a month of gas consumption).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityData {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope: Scope,
    pub calculated_co2e_kg: Option<Decimal>,
    pub is_fallback_calculation: bool,
    pub is_simulation: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-company singleton holding average unit costs, used for ROI/cost
/// projections when the user hasn't supplied a cost on a specific record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyFinancials {
    pub company_id: Uuid,
    pub avg_electricity_cost_kwh: Option<Decimal>,
    pub avg_gas_cost_m3: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Typical per-employee/per-vehicle consumption figures for an industry,
/// used by the suggestion engine and benchmarking fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndustryTemplate {
    pub id: Uuid,
    pub industry_type: String,
    pub typical_kwh_per_employee: Decimal,
    pub typical_fuel_per_vehicle: Decimal,
    pub best_in_class_electricity_kwh: Decimal,
    pub average_electricity_kwh: Decimal,
    pub cost_ratio: Decimal,
}

/// A keyed numeric parameter driving the suggestion engine (city factors,
/// ROI thresholds, cost assumptions).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SuggestionParameter {
    pub key: String,
    pub value: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    TotalCo2e,
    Scope1Co2e,
    Scope2Co2e,
    Intensity,
}

/// A company's declared reduction target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityTarget {
    pub id: Uuid,
    pub company_id: Uuid,
    pub metric: TargetMetric,
    pub target_value: Decimal,
    pub target_year: i32,
    pub baseline_year: i32,
    pub baseline_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceMime {
    Pdf,
    Jpeg,
    Png,
}

/// A user-uploaded utility bill and its OCR extraction state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub uploaded_by_user_id: Uuid,
    pub file_path: String,
    pub mime: InvoiceMime,
    pub status: InvoiceStatus,
    pub extracted_activity_kind: Option<ActivityKind>,
    pub extracted_quantity: Option<Decimal>,
    pub extracted_cost_tl: Option<Decimal>,
    pub extracted_start_date: Option<NaiveDate>,
    pub extracted_end_date: Option<NaiveDate>,
    pub extracted_text: Option<String>,
    pub confidence: Option<f64>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub produced_activity_data_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    CbamXml,
    RoiAnalysis,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Expired,
}

/// A generated report artifact (CBAM XML, ROI analysis JSON, or both).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub company_id: Uuid,
    pub report_type: ReportType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: ReportStatus,
    pub worker_task_id: Option<String>,
    pub file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub download_count: i64,
    pub summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A third-party vendor in the supplier network (used for Scope 3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub contact_email: String,
    pub is_active: bool,
    pub is_admin_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

/// A tokened invitation linking a `Company` to a `Supplier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierInvitation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub supplier_id: Uuid,
    pub invite_token: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    SelfDeclared,
    DocumentBacked,
    Audited,
}

/// A supplier-declared product with a per-unit carbon footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFootprint {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub product_category: String,
    pub unit: String,
    pub co2e_per_unit_kg: Decimal,
    pub verification_level: VerificationLevel,
    pub verifier_user_id: Option<Uuid>,
    pub verification_document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded Scope 3 purchase of a supplier's product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Scope3Emission {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub product_footprint_id: Uuid,
    pub quantity_purchased: Decimal,
    pub purchase_date: NaiveDate,
    pub calculated_co2e_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvoiceProcessed,
    ReportReady,
    Anomaly,
    SupplierInvite,
    General,
}

/// An in-app notification, optionally mirrored via email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A badge definition earned through gamified milestones.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBadge {
    pub user_id: Uuid,
    pub badge_id: Uuid,
    pub earned_at: DateTime<Utc>,
}

/// A pre-ranked leaderboard row, refreshed periodically by analytics workers.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub company_id: Uuid,
    pub industry_type: String,
    pub region: String,
    pub rank: i32,
    pub efficiency_score: Decimal,
    pub computed_at: DateTime<Utc>,
}

/// Append-only record of every processed event id, kept for idempotency
/// audit trails separate from the live idempotency lock.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventLogEntry {
    pub event_id: Uuid,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A record of a validation rejection, kept for observability on why rows
/// in a CSV/OCR/API submission were dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub id: Uuid,
    pub facility_id: Option<Uuid>,
    pub code: String,
    pub field: String,
    pub message: String,
    pub severity: IssueSeverity,
    pub created_at: DateTime<Utc>,
}
