//! Suppliers, invitations, product footprints and Scope 3 purchases.

use carbonledger_core::entities::{
    InvitationStatus, ProductFootprint, Scope3Emission, Supplier, SupplierInvitation,
    VerificationLevel,
};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct InvitationRow {
    id: Uuid,
    company_id: Uuid,
    supplier_id: Uuid,
    invite_token: String,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for SupplierInvitation {
    type Error = AppError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(SupplierInvitation {
            id: row.id,
            company_id: row.company_id,
            supplier_id: row.supplier_id,
            invite_token: row.invite_token,
            status: parse_invitation_status(&row.status)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

fn parse_invitation_status(raw: &str) -> AppResult<InvitationStatus> {
    match raw {
        "pending" => Ok(InvitationStatus::Pending),
        "accepted" => Ok(InvitationStatus::Accepted),
        "rejected" => Ok(InvitationStatus::Rejected),
        "expired" => Ok(InvitationStatus::Expired),
        other => Err(AppError::Internal(format!("unknown invitation status {other}"))),
    }
}

pub fn invitation_status_str(status: InvitationStatus) -> &'static str {
    match status {
        InvitationStatus::Pending => "pending",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Rejected => "rejected",
        InvitationStatus::Expired => "expired",
    }
}

#[derive(FromRow)]
struct ProductFootprintRow {
    id: Uuid,
    supplier_id: Uuid,
    product_category: String,
    unit: String,
    co2e_per_unit_kg: Decimal,
    verification_level: String,
    verifier_user_id: Option<Uuid>,
    verification_document_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductFootprintRow> for ProductFootprint {
    type Error = AppError;

    fn try_from(row: ProductFootprintRow) -> Result<Self, Self::Error> {
        Ok(ProductFootprint {
            id: row.id,
            supplier_id: row.supplier_id,
            product_category: row.product_category,
            unit: row.unit,
            co2e_per_unit_kg: row.co2e_per_unit_kg,
            verification_level: parse_verification_level(&row.verification_level)?,
            verifier_user_id: row.verifier_user_id,
            verification_document_ref: row.verification_document_ref,
            created_at: row.created_at,
        })
    }
}

fn parse_verification_level(raw: &str) -> AppResult<VerificationLevel> {
    match raw {
        "self_declared" => Ok(VerificationLevel::SelfDeclared),
        "document_backed" => Ok(VerificationLevel::DocumentBacked),
        "audited" => Ok(VerificationLevel::Audited),
        other => Err(AppError::Internal(format!("unknown verification level {other}"))),
    }
}

pub fn verification_level_str(level: VerificationLevel) -> &'static str {
    match level {
        VerificationLevel::SelfDeclared => "self_declared",
        VerificationLevel::DocumentBacked => "document_backed",
        VerificationLevel::Audited => "audited",
    }
}

#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_or_create_by_email(&self, contact_email: &str) -> AppResult<Supplier> {
        if let Some(existing) = sqlx::query_as::<_, Supplier>(
            "SELECT id, contact_email, is_active, is_admin_verified, created_at
             FROM suppliers WHERE contact_email = $1",
        )
        .bind(contact_email)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        let supplier = Supplier {
            id: Uuid::new_v4(),
            contact_email: contact_email.to_string(),
            is_active: true,
            is_admin_verified: false,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO suppliers (id, contact_email, is_active, is_admin_verified, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(supplier.id)
        .bind(&supplier.contact_email)
        .bind(supplier.is_active)
        .bind(supplier.is_admin_verified)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, contact_email, is_active, is_admin_verified, created_at
             FROM suppliers WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(supplier)
    }
}

#[derive(Clone)]
pub struct SupplierInvitationRepository {
    pool: PgPool,
}

impl SupplierInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, invitation: &SupplierInvitation) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO supplier_invitations
             (id, company_id, supplier_id, invite_token, status, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(invitation.id)
        .bind(invitation.company_id)
        .bind(invitation.supplier_id)
        .bind(&invitation.invite_token)
        .bind(invitation_status_str(invitation.status))
        .bind(invitation.expires_at)
        .bind(invitation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> AppResult<SupplierInvitation> {
        let row = sqlx::query_as::<_, InvitationRow>(
            "SELECT id, company_id, supplier_id, invite_token, status, expires_at, created_at
             FROM supplier_invitations WHERE invite_token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    pub async fn set_status(&self, id: Uuid, status: InvitationStatus) -> AppResult<()> {
        sqlx::query("UPDATE supplier_invitations SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(invitation_status_str(status))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProductFootprintRepository {
    pool: PgPool,
}

impl ProductFootprintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, footprint: &ProductFootprint) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO product_footprints
             (id, supplier_id, product_category, unit, co2e_per_unit_kg, verification_level,
              verifier_user_id, verification_document_ref, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(footprint.id)
        .bind(footprint.supplier_id)
        .bind(&footprint.product_category)
        .bind(&footprint.unit)
        .bind(footprint.co2e_per_unit_kg)
        .bind(verification_level_str(footprint.verification_level))
        .bind(footprint.verifier_user_id)
        .bind(&footprint.verification_document_ref)
        .bind(footprint.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<ProductFootprint> {
        let row = sqlx::query_as::<_, ProductFootprintRow>(
            "SELECT id, supplier_id, product_category, unit, co2e_per_unit_kg, verification_level,
                    verifier_user_id, verification_document_ref, created_at
             FROM product_footprints WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    /// Peer footprints in the same product category with a positive factor
    /// (spec §4.H), used for the category mean/median/25th-percentile
    /// "best in class" benchmark.
    pub async fn list_by_category(&self, product_category: &str) -> AppResult<Vec<Decimal>> {
        let values: Vec<(Decimal,)> = sqlx::query_as(
            "SELECT co2e_per_unit_kg FROM product_footprints
             WHERE product_category = $1 AND co2e_per_unit_kg > 0",
        )
        .bind(product_category)
        .fetch_all(&self.pool)
        .await?;
        Ok(values.into_iter().map(|(v,)| v).collect())
    }

    /// Every distinct category with at least one positively-factored entry.
    pub async fn list_distinct_categories(&self) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT product_category FROM product_footprints WHERE co2e_per_unit_kg > 0",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }
}

#[derive(Clone)]
pub struct Scope3EmissionRepository {
    pool: PgPool,
}

impl Scope3EmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, emission: &Scope3Emission) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO scope3_emissions
             (id, facility_id, product_footprint_id, quantity_purchased, purchase_date,
              calculated_co2e_kg, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(emission.id)
        .bind(emission.facility_id)
        .bind(emission.product_footprint_id)
        .bind(emission.quantity_purchased)
        .bind(emission.purchase_date)
        .bind(emission.calculated_co2e_kg)
        .bind(emission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_facility(&self, facility_id: Uuid) -> AppResult<Vec<Scope3Emission>> {
        let rows = sqlx::query_as::<_, Scope3Emission>(
            "SELECT id, facility_id, product_footprint_id, quantity_purchased, purchase_date,
                    calculated_co2e_kg, created_at
             FROM scope3_emissions WHERE facility_id = $1",
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_status_round_trips_through_its_column_encoding() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Rejected,
            InvitationStatus::Expired,
        ] {
            assert_eq!(parse_invitation_status(invitation_status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn verification_level_round_trips_through_its_column_encoding() {
        for level in [
            VerificationLevel::SelfDeclared,
            VerificationLevel::DocumentBacked,
            VerificationLevel::Audited,
        ] {
            assert_eq!(parse_verification_level(verification_level_str(level)).unwrap(), level);
        }
    }
}
