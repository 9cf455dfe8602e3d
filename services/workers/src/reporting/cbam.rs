//! CBAM XML synthesis (spec §4.G): a fixed-namespace regulatory filing
//! aggregating non-simulation ActivityData per Facility, grouped by scope.

use carbonledger_core::entities::{ActivityData, Company, Facility, Scope, User};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

const NAMESPACE: &str = "urn:eu:cbam:report:v1";
/// No country field is modelled on `Company` (spec is silent); every
/// deployment of this platform targets Turkish SMEs reporting imports into
/// the EU, so the declarant's country is fixed. Documented in DESIGN.md.
const DECLARANT_COUNTRY: &str = "TR";

#[derive(Debug, Serialize)]
#[serde(rename = "CBAMReport")]
pub struct CbamReport {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    pub header: ReportHeader,
    pub declarant: Declarant,
    pub installations: Installations,
    pub imported_goods: ImportedGoods,
    pub summary: Summary,
    pub verification: Verification,
}

#[derive(Debug, Serialize)]
pub struct ReportHeader {
    pub report_id: String,
    pub period_start: String,
    pub period_end: String,
    pub submission_date: String,
    pub report_type: String,
}

#[derive(Debug, Serialize)]
pub struct Declarant {
    pub company_name: String,
    pub tax_number: String,
    pub country: String,
    pub owner_email: String,
}

#[derive(Debug, Serialize)]
pub struct Installations {
    #[serde(rename = "Installation")]
    pub installations: Vec<Installation>,
}

#[derive(Debug, Serialize)]
pub struct Installation {
    pub facility_name: String,
    pub city: String,
    pub direct_emissions: DirectEmissions,
    pub indirect_emissions: IndirectEmissions,
}

#[derive(Debug, Serialize)]
pub struct DirectEmissions {
    #[serde(rename = "FuelLine")]
    pub fuel_lines: Vec<EmissionLine>,
}

#[derive(Debug, Serialize)]
pub struct IndirectEmissions {
    #[serde(rename = "ElectricityLine")]
    pub electricity_lines: Vec<EmissionLine>,
}

#[derive(Debug, Serialize)]
pub struct EmissionLine {
    pub activity_kind: String,
    pub tco2e: String,
}

/// Always present, always empty: the platform does not yet model imported
/// goods, but the schema requires the element (spec §4.G).
#[derive(Debug, Serialize, Default)]
pub struct ImportedGoods {
    #[serde(rename = "Good")]
    pub goods: Vec<()>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_emissions_tco2e: String,
    pub scope1_tco2e: String,
    pub scope2_tco2e: String,
}

#[derive(Debug, Serialize)]
pub struct Verification {
    pub status: String,
}

fn kg_to_tco2e(kg: Decimal) -> Decimal {
    kg / Decimal::from(1000)
}

/// Build the document tree from aggregated facility activity. `activity_by_facility`
/// holds only non-simulation rows already filtered to `[start, end]`.
pub fn build_report(
    company: &Company,
    owner: &User,
    facilities: &[Facility],
    activity_by_facility: &HashMap<uuid::Uuid, Vec<ActivityData>>,
    period_start: chrono::NaiveDate,
    period_end: chrono::NaiveDate,
    report_id: uuid::Uuid,
    submission_date: chrono::DateTime<chrono::Utc>,
) -> CbamReport {
    let mut installations = Vec::new();
    let mut scope1_total = Decimal::ZERO;
    let mut scope2_total = Decimal::ZERO;

    for facility in facilities {
        let rows = activity_by_facility.get(&facility.id).map(Vec::as_slice).unwrap_or(&[]);

        let mut fuel_lines = Vec::new();
        let mut electricity_lines = Vec::new();

        for row in rows {
            let Some(co2e_kg) = row.calculated_co2e_kg else {
                continue;
            };
            let tco2e = kg_to_tco2e(co2e_kg);
            match row.scope {
                Scope::Scope1 => {
                    scope1_total += tco2e;
                    fuel_lines.push(EmissionLine {
                        activity_kind: row.activity_kind.as_str().to_string(),
                        tco2e: tco2e.to_string(),
                    });
                }
                Scope::Scope2 => {
                    scope2_total += tco2e;
                    electricity_lines.push(EmissionLine {
                        activity_kind: row.activity_kind.as_str().to_string(),
                        tco2e: tco2e.to_string(),
                    });
                }
                Scope::Scope3 => {}
            }
        }

        installations.push(Installation {
            facility_name: facility.name.clone(),
            city: facility.city.clone(),
            direct_emissions: DirectEmissions { fuel_lines },
            indirect_emissions: IndirectEmissions { electricity_lines },
        });
    }

    CbamReport {
        xmlns: NAMESPACE.to_string(),
        header: ReportHeader {
            report_id: report_id.to_string(),
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            submission_date: submission_date.to_rfc3339(),
            report_type: "cbam_xml".to_string(),
        },
        declarant: Declarant {
            company_name: company.name.clone(),
            tax_number: company.tax_number.clone().unwrap_or_default(),
            country: DECLARANT_COUNTRY.to_string(),
            owner_email: owner.email.clone(),
        },
        installations: Installations { installations },
        imported_goods: ImportedGoods::default(),
        summary: Summary {
            total_emissions_tco2e: (scope1_total + scope2_total).to_string(),
            scope1_tco2e: scope1_total.to_string(),
            scope2_tco2e: scope2_total.to_string(),
        },
        verification: Verification {
            status: "PENDING".to_string(),
        },
    }
}

pub fn serialize(report: &CbamReport) -> Result<String, quick_xml::SeError> {
    let body = quick_xml::se::to_string(report)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn summary_totals_scope1_and_scope2_in_tonnes() {
        let company = Company {
            id: Uuid::new_v4(),
            name: "Acme Co".into(),
            tax_number: Some("1234567890".into()),
            industry_type: "manufacturing".into(),
            owner_user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let owner = User {
            id: company.owner_user_id,
            email: "owner@acme.test".into(),
            hashed_password: "x".into(),
            is_active: true,
            is_superuser: false,
            created_at: Utc::now(),
        };
        let facility = Facility {
            id: Uuid::new_v4(),
            company_id: company.id,
            name: "F1".into(),
            city: "Istanbul".into(),
            address: None,
            facility_type: carbonledger_core::entities::FacilityType::Production,
            surface_area_m2: Some(dec!(1000)),
            created_at: Utc::now(),
        };
        let activity = ActivityData {
            id: Uuid::new_v4(),
            facility_id: facility.id,
            activity_kind: carbonledger_core::entities::ActivityKind::Electricity,
            quantity: dec!(1500),
            unit: "kWh".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            scope: Scope::Scope2,
            calculated_co2e_kg: Some(dec!(712.5)),
            is_fallback_calculation: true,
            is_simulation: false,
            created_at: Utc::now(),
        };
        let mut by_facility = HashMap::new();
        by_facility.insert(facility.id, vec![activity]);

        let report = build_report(
            &company,
            &owner,
            &[facility],
            &by_facility,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(report.summary.scope2_tco2e, "0.7125");
        assert_eq!(report.summary.scope1_tco2e, "0");
        assert_eq!(report.declarant.country, "TR");
        assert_eq!(report.verification.status, "PENDING");
    }

    #[test]
    fn serializes_into_well_formed_xml_with_fixed_namespace() {
        let company = Company {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            tax_number: None,
            industry_type: "manufacturing".into(),
            owner_user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let owner = User {
            id: company.owner_user_id,
            email: "owner@acme.test".into(),
            hashed_password: "x".into(),
            is_active: true,
            is_superuser: false,
            created_at: Utc::now(),
        };
        let report = build_report(
            &company,
            &owner,
            &[],
            &HashMap::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            Uuid::new_v4(),
            Utc::now(),
        );
        let xml = serialize(&report).unwrap();
        assert!(xml.contains(NAMESPACE));
        assert!(xml.contains("PENDING"));
    }
}
