//! Parameter lookups shared by every strategy, with the defaults spec §4.J
//! calls out when a `SuggestionParameter` row is absent.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::strategy::Parameters;

pub fn get_or(params: &Parameters, key: &str, default: Decimal) -> Decimal {
    params.get(key).copied().unwrap_or(default)
}

/// City-keyed solar irradiance/efficiency factor. Per spec §9's open
/// question the source uses both `city_factor_<city>` and `city_ges_<city>`
/// across migrations; this system standardises on `city_ges_<city>`
/// (documented in DESIGN.md) and falls back to a conservative default for
/// unmodelled cities.
pub fn city_solar_factor(params: &Parameters, city: &str) -> Decimal {
    get_or(params, &format!("city_ges_{}", normalize_city(city)), dec!(0.85))
}

/// City-keyed heating-degree-day factor used by the insulation strategy.
pub fn city_heating_factor(params: &Parameters, city: &str) -> Decimal {
    get_or(params, &format!("city_heating_{}", normalize_city(city)), dec!(1.0))
}

fn normalize_city(city: &str) -> String {
    city.to_lowercase()
        .replace('ı', "i")
        .replace('ş', "s")
        .replace('ğ', "g")
        .replace('ü', "u")
        .replace('ö', "o")
        .replace('ç', "c")
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmodelled_city_falls_back_to_the_conservative_default() {
        let params = Parameters::new();
        assert_eq!(city_solar_factor(&params, "Istanbul"), dec!(0.85));
        assert_eq!(city_heating_factor(&params, "Istanbul"), dec!(1.0));
    }

    #[test]
    fn a_configured_city_parameter_overrides_the_default() {
        let mut params = Parameters::new();
        params.insert("city_ges_istanbul".to_string(), dec!(0.92));
        assert_eq!(city_solar_factor(&params, "İstanbul"), dec!(0.92));
    }
}
