//! Users, companies, facilities and memberships.

use carbonledger_core::entities::{Company, Facility, FacilityType, Member, Role, User};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct FacilityRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    city: String,
    address: Option<String>,
    facility_type: String,
    surface_area_m2: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FacilityRow> for Facility {
    type Error = AppError;

    fn try_from(row: FacilityRow) -> Result<Self, Self::Error> {
        Ok(Facility {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            city: row.city,
            address: row.address,
            facility_type: parse_facility_type(&row.facility_type)?,
            surface_area_m2: row.surface_area_m2,
            created_at: row.created_at,
        })
    }
}

fn parse_facility_type(raw: &str) -> AppResult<FacilityType> {
    match raw {
        "production" => Ok(FacilityType::Production),
        "warehouse" => Ok(FacilityType::Warehouse),
        "office" => Ok(FacilityType::Office),
        "retail" => Ok(FacilityType::Retail),
        "other" => Ok(FacilityType::Other),
        other => Err(AppError::Internal(format!("unknown facility_type {other}"))),
    }
}

fn facility_type_str(kind: FacilityType) -> &'static str {
    match kind {
        FacilityType::Production => "production",
        FacilityType::Warehouse => "warehouse",
        FacilityType::Office => "office",
        FacilityType::Retail => "retail",
        FacilityType::Other => "other",
    }
}

#[derive(FromRow)]
struct MemberRow {
    id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    role: String,
    facility_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = AppError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            id: row.id,
            user_id: row.user_id,
            company_id: row.company_id,
            role: parse_role(&row.role)?,
            facility_id: row.facility_id,
            created_at: row.created_at,
        })
    }
}

pub fn parse_role(raw: &str) -> AppResult<Role> {
    match raw {
        "viewer" => Ok(Role::Viewer),
        "data_entry" => Ok(Role::DataEntry),
        "admin" => Ok(Role::Admin),
        "owner" => Ok(Role::Owner),
        other => Err(AppError::Internal(format!("unknown role {other}"))),
    }
}

pub fn role_str(role: Role) -> &'static str {
    match role {
        Role::Viewer => "viewer",
        Role::DataEntry => "data_entry",
        Role::Admin => "admin",
        Role::Owner => "owner",
    }
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, hashed_password, is_active, is_superuser, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, is_active, is_superuser, created_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, is_active, is_superuser, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, company: &Company) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO companies (id, name, tax_number, industry_type, owner_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.tax_number)
        .bind(&company.industry_type)
        .bind(company.owner_user_id)
        .bind(company.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Company> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, tax_number, industry_type, owner_user_id, created_at
             FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn list_by_industry(&self, industry_type: &str) -> AppResult<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, tax_number, industry_type, owner_user_id, created_at
             FROM companies WHERE industry_type = $1",
        )
        .bind(industry_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    /// Distinct industries with at least one registered company, used to
    /// fan the daily anomaly scan and weekly benchmark refresh out across
    /// every industry without a hardcoded list.
    pub async fn list_distinct_industry_types(&self) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT industry_type FROM companies")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

#[derive(Clone)]
pub struct FacilityRepository {
    pool: PgPool,
}

impl FacilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, facility: &Facility) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO facilities (id, company_id, name, city, address, facility_type, surface_area_m2, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(facility.id)
        .bind(facility.company_id)
        .bind(&facility.name)
        .bind(&facility.city)
        .bind(&facility.address)
        .bind(facility_type_str(facility.facility_type))
        .bind(facility.surface_area_m2)
        .bind(facility.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Facility> {
        let row = sqlx::query_as::<_, FacilityRow>(
            "SELECT id, company_id, name, city, address, facility_type, surface_area_m2, created_at
             FROM facilities WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    pub async fn list_by_company(&self, company_id: Uuid) -> AppResult<Vec<Facility>> {
        let rows = sqlx::query_as::<_, FacilityRow>(
            "SELECT id, company_id, name, city, address, facility_type, surface_area_m2, created_at
             FROM facilities WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Facility::try_from).collect()
    }

    /// Peer set for benchmarking: same industry, same city, excluding one facility.
    pub async fn list_peers(
        &self,
        industry_type: &str,
        city: &str,
        exclude_facility_id: Uuid,
    ) -> AppResult<Vec<Facility>> {
        let rows = sqlx::query_as::<_, FacilityRow>(
            "SELECT f.id, f.company_id, f.name, f.city, f.address, f.facility_type, f.surface_area_m2, f.created_at
             FROM facilities f
             JOIN companies c ON c.id = f.company_id
             WHERE c.industry_type = $1 AND f.city = $2 AND f.id != $3
               AND f.surface_area_m2 IS NOT NULL AND f.surface_area_m2 > 0",
        )
        .bind(industry_type)
        .bind(city)
        .bind(exclude_facility_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Facility::try_from).collect()
    }
}

#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, member: &Member) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO members (id, user_id, company_id, role, facility_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(member.id)
        .bind(member.user_id)
        .bind(member.company_id)
        .bind(role_str(member.role))
        .bind(member.facility_id)
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, user_id: Uuid, company_id: Uuid) -> AppResult<Member> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, user_id, company_id, role, facility_id, created_at
             FROM members WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    pub async fn list_by_company(&self, company_id: Uuid) -> AppResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, user_id, company_id, role, facility_id, created_at
             FROM members WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Member::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_column_encoding() {
        for role in [Role::Viewer, Role::DataEntry, Role::Admin, Role::Owner] {
            assert_eq!(parse_role(role_str(role)).unwrap(), role);
        }
    }

    #[test]
    fn facility_type_round_trips_through_its_column_encoding() {
        for kind in [
            FacilityType::Production,
            FacilityType::Warehouse,
            FacilityType::Office,
            FacilityType::Retail,
            FacilityType::Other,
        ] {
            assert_eq!(parse_facility_type(facility_type_str(kind)).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_role_column_value_is_rejected() {
        assert!(parse_role("superadmin").is_err());
    }
}
