//! # Generation Inference
//!
//! Derives a CPU generation codename from the model code and launch year
//! when the source data does not carry one. Covers AMD EPYC and Intel Xeon
//! (Scalable and legacy E5) families; anything else yields no codename.
//!
//! Pure lookup logic; the importer and the create path call this when the
//! codename field is absent.

/// Infer the generation codename for a CPU, if the model/year pattern is
/// recognized.
#[must_use]
pub fn infer_codename(
    model_code: &str,
    launch_year: i32,
    family: Option<&str>,
) -> Option<&'static str> {
    let model = model_code.trim().to_uppercase();
    if model.is_empty() {
        return None;
    }
    let family = family.unwrap_or("").trim().to_uppercase();
    let year = launch_year;

    if model.contains("EPYC") || family.contains("EPYC") {
        return infer_epyc(&model, year);
    }
    if model.contains("XEON") || family.contains("XEON") {
        if let Some(name) = infer_xeon_scalable(&model, year) {
            return Some(name);
        }
        // Legacy E5/E3 parts carry a version suffix instead of a series digit.
        if model.contains("E5") || model.contains("E3") {
            return infer_xeon_legacy(&model, year);
        }
        // Fallback by year alone for Scalable-branded families.
        if ["SCALABLE", "GOLD", "PLATINUM", "SILVER"]
            .iter()
            .any(|tier| family.contains(tier))
        {
            return scalable_by_year(year);
        }
    }
    None
}

fn infer_epyc(model: &str, year: i32) -> Option<&'static str> {
    if model.contains("EPYC 9") {
        return match year {
            2022 | 2023 => Some("Genoa"),
            _ => None,
        };
    }
    if model.contains("EPYC 8") {
        return (year >= 2023).then_some("Siena");
    }
    if model.contains("EPYC 4") {
        return (year == 2023).then_some("Genoa");
    }
    // 7xxx series, or unqualified EPYC models: go by year.
    match year {
        2017 => Some("Naples"),
        2019 | 2020 => Some("Rome"),
        2021 | 2022 => Some("Milan"),
        _ => None,
    }
}

fn infer_xeon_scalable(model: &str, year: i32) -> Option<&'static str> {
    let series = first_model_number(model)?;
    match series / 1000 {
        8 => match year {
            2017 | 2018 => Some("Skylake"),
            2023 => {
                if series >= 8600 {
                    Some("Emerald Rapids")
                } else {
                    Some("Sapphire Rapids")
                }
            }
            2024 => {
                if series >= 8500 {
                    Some("Emerald Rapids")
                } else {
                    Some("Sapphire Rapids")
                }
            }
            _ => None,
        },
        6 => matches!(year, 2019 | 2020).then_some("Cascade Lake"),
        5 | 4 => (year == 2021).then_some("Ice Lake"),
        _ => None,
    }
}

fn infer_xeon_legacy(model: &str, year: i32) -> Option<&'static str> {
    if (model.contains("V2") || model.contains("V 2")) && year == 2013 {
        return Some("Ivy Bridge");
    }
    if (model.contains("V3") || model.contains("V 3")) && year == 2014 {
        return Some("Haswell");
    }
    if (model.contains("V4") || model.contains("V 4")) && year == 2016 {
        return Some("Broadwell");
    }
    None
}

fn scalable_by_year(year: i32) -> Option<&'static str> {
    match year {
        2017 | 2018 => Some("Skylake"),
        2019 | 2020 => Some("Cascade Lake"),
        2021 => Some("Ice Lake"),
        2023 => Some("Sapphire Rapids"),
        2024 => Some("Emerald Rapids"),
        _ => None,
    }
}

/// Extract the first run of exactly four consecutive digits ("Gold 6240
/// CPU" -> 6240). Longer digit runs are not model numbers.
fn first_model_number(model: &str) -> Option<u32> {
    let bytes = model.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return model[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epyc_generations_by_series_and_year() {
        assert_eq!(infer_codename("EPYC 7301", 2017, None), Some("Naples"));
        assert_eq!(infer_codename("EPYC 7542", 2019, None), Some("Rome"));
        assert_eq!(infer_codename("EPYC 7763", 2021, None), Some("Milan"));
        assert_eq!(infer_codename("EPYC 9654", 2022, None), Some("Genoa"));
        assert_eq!(infer_codename("EPYC 8324P", 2023, None), Some("Siena"));
    }

    #[test]
    fn epyc_family_hint_counts() {
        assert_eq!(
            infer_codename("7543", 2021, Some("AMD EPYC")),
            Some("Milan")
        );
    }

    #[test]
    fn xeon_scalable_series() {
        assert_eq!(
            infer_codename("Xeon Platinum 8168", 2017, None),
            Some("Skylake")
        );
        assert_eq!(
            infer_codename("Xeon Gold 6240", 2019, None),
            Some("Cascade Lake")
        );
        assert_eq!(
            infer_codename("Xeon Gold 5318Y", 2021, None),
            Some("Ice Lake")
        );
        assert_eq!(
            infer_codename("Xeon Platinum 8480+", 2023, None),
            Some("Sapphire Rapids")
        );
        assert_eq!(
            infer_codename("Xeon Platinum 8692", 2023, None),
            Some("Emerald Rapids")
        );
    }

    #[test]
    fn xeon_year_fallback_needs_scalable_family() {
        assert_eq!(
            infer_codename("Xeon custom", 2021, Some("Intel Xeon Gold")),
            Some("Ice Lake")
        );
        assert_eq!(infer_codename("Xeon custom", 2021, None), None);
    }

    #[test]
    fn legacy_xeon_versions() {
        assert_eq!(
            infer_codename("Xeon E5-2697 v2", 2013, Some("Intel Xeon")),
            Some("Ivy Bridge")
        );
        assert_eq!(
            infer_codename("Xeon E5-2699 v4", 2016, Some("Intel Xeon")),
            Some("Broadwell")
        );
    }

    #[test]
    fn unknown_inputs_yield_nothing() {
        assert_eq!(infer_codename("", 2020, None), None);
        assert_eq!(infer_codename("Threadripper 3990X", 2020, None), None);
        assert_eq!(infer_codename("EPYC 7763", 1995, None), None);
    }

    #[test]
    fn model_number_extraction() {
        assert_eq!(first_model_number("GOLD 6240R"), Some(6240));
        assert_eq!(first_model_number("E5-2697"), Some(2697));
        assert_eq!(first_model_number("NO DIGITS"), None);
        assert_eq!(first_model_number("12345"), None);
    }
}
