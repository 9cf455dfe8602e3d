//! Cross-module check for the CBAM round-trip law (spec §8): "a CBAM XML
//! document passes the structural validator immediately after generation."
//! This walks the generated document with `quick_xml`'s event reader and
//! asserts every opened element is closed, in order, with no malformed
//! tokens — a cheap, dependency-free stand-in for an XSD validator.

use std::collections::HashMap;

use carbonledger_core::entities::{
    ActivityData, ActivityKind, Company, Facility, FacilityType, Scope, User,
};
use carbonledger_workers::reporting::cbam::{build_report, serialize};
use chrono::{NaiveDate, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn sample_company() -> (Company, User) {
    let owner_id = Uuid::new_v4();
    let company = Company {
        id: Uuid::new_v4(),
        name: "Anadolu Metal A.Ş.".into(),
        tax_number: Some("9876543210".into()),
        industry_type: "manufacturing".into(),
        owner_user_id: owner_id,
        created_at: Utc::now(),
    };
    let owner = User {
        id: owner_id,
        email: "owner@anadolumetal.test".into(),
        hashed_password: "irrelevant".into(),
        is_active: true,
        is_superuser: false,
        created_at: Utc::now(),
    };
    (company, owner)
}

fn sample_facility(company_id: Uuid, city: &str) -> Facility {
    Facility {
        id: Uuid::new_v4(),
        company_id,
        name: format!("Plant {city}"),
        city: city.to_string(),
        address: None,
        facility_type: FacilityType::Production,
        surface_area_m2: Some(dec!(4200)),
        created_at: Utc::now(),
    }
}

fn activity(facility_id: Uuid, kind: ActivityKind, scope: Scope, co2e_kg: rust_decimal::Decimal) -> ActivityData {
    ActivityData {
        id: Uuid::new_v4(),
        facility_id,
        activity_kind: kind,
        quantity: dec!(1),
        unit: "kWh".into(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        scope,
        calculated_co2e_kg: Some(co2e_kg),
        is_fallback_calculation: false,
        is_simulation: false,
        created_at: Utc::now(),
    }
}

/// Asserts the document is well-formed: every start tag has a matching end
/// tag, in LIFO order, and the reader never emits a parse error.
fn assert_well_formed(xml: &str) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut saw_any_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                saw_any_element = true;
                stack.push(String::from_utf8_lossy(start.name().as_ref()).to_string());
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_string();
                let opened = stack.pop().unwrap_or_else(|| panic!("unmatched closing tag </{name}>"));
                assert_eq!(opened, name, "mismatched open/close tags");
            }
            Ok(Event::Empty(empty)) => {
                saw_any_element = true;
                let _ = empty.name();
            }
            Ok(_) => {}
            Err(err) => panic!("CBAM document is not well-formed XML: {err}"),
        }
    }

    assert!(saw_any_element, "document had no elements at all");
    assert!(stack.is_empty(), "unclosed elements remained: {stack:?}");
}

#[test]
fn generated_report_passes_structural_validation_for_two_facilities_two_scopes() {
    let (company, owner) = sample_company();
    let istanbul = sample_facility(company.id, "İstanbul");
    let kocaeli = sample_facility(company.id, "Kocaeli");

    let mut by_facility = HashMap::new();
    by_facility.insert(
        istanbul.id,
        vec![
            activity(istanbul.id, ActivityKind::Electricity, Scope::Scope2, dec!(712.5)),
            activity(istanbul.id, ActivityKind::NaturalGas, Scope::Scope1, dec!(2030)),
        ],
    );
    by_facility.insert(
        kocaeli.id,
        vec![activity(kocaeli.id, ActivityKind::DieselFuel, Scope::Scope1, dec!(268))],
    );

    let report = build_report(
        &company,
        &owner,
        &[istanbul, kocaeli],
        &by_facility,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        Uuid::new_v4(),
        Utc::now(),
    );

    // Summary/TotalEmissions equals the sum of all scope 1 + scope 2 tCO2e
    // in the window, to within the serialized decimal's own precision.
    let expected_total = dec!(0.7125) + dec!(2.03) + dec!(0.268);
    let actual_total: rust_decimal::Decimal = report.summary.total_emissions_tco2e.parse().unwrap();
    assert_eq!(actual_total, expected_total);

    let xml = serialize(&report).expect("serialization must succeed");
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert_well_formed(&xml);
}

#[test]
fn generated_report_with_no_installations_is_still_well_formed() {
    let (company, owner) = sample_company();
    let report = build_report(
        &company,
        &owner,
        &[],
        &HashMap::new(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        Uuid::new_v4(),
        Utc::now(),
    );
    let xml = serialize(&report).expect("serialization must succeed");
    assert_well_formed(&xml);
    assert_eq!(report.summary.total_emissions_tco2e, "0");
}
