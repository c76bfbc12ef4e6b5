//! Canonical feature vocabulary and the column-name alias table.
//!
//! The table is plain data: every accepted spelling is listed explicitly,
//! including case variants. Lookups never fold case, so `Temp`, `temp` and
//! `Temperature` each need their own entry.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Categorical soil classification column.
pub const SOIL_TYPE: &str = "soil_type";

/// Prefix of the one-hot indicator columns derived from [`SOIL_TYPE`].
pub const SOIL_TYPE_PREFIX: &str = "soil_type_";

/// Regression target, only meaningful in training tables.
pub const PRODUCTIVITY_SCORE: &str = "productivity_score";

/// Canonical numeric features in their canonical order.
pub const NUMERIC_FEATURES: [&str; 16] = [
    "nitrogen",
    "phosphorus",
    "potassium",
    "ph",
    "organic_matter",
    "electrical_conductivity",
    "sulphur",
    "zinc",
    "iron",
    "copper",
    "manganese",
    "boron",
    "moisture",
    "temperature",
    "humidity",
    "rainfall",
];

/// Accepted input names, as `(alias, canonical)` pairs.
///
/// Each canonical name appears as an alias of itself. An alias must occur at
/// most once.
pub static FEATURE_ALIASES: &[(&str, &str)] = &[
    // Macronutrients
    ("nitrogen", "nitrogen"),
    ("Nitrogen", "nitrogen"),
    ("NITROGEN", "nitrogen"),
    ("N", "nitrogen"),
    ("n", "nitrogen"),
    ("phosphorus", "phosphorus"),
    ("Phosphorus", "phosphorus"),
    ("PHOSPHORUS", "phosphorus"),
    ("P", "phosphorus"),
    ("p", "phosphorus"),
    ("potassium", "potassium"),
    ("Potassium", "potassium"),
    ("POTASSIUM", "potassium"),
    ("K", "potassium"),
    ("k", "potassium"),
    // Soil chemistry
    ("ph", "ph"),
    ("pH", "ph"),
    ("PH", "ph"),
    ("Ph", "ph"),
    ("ph_value", "ph"),
    ("pH_value", "ph"),
    ("acidity", "ph"),
    ("Acidity", "ph"),
    ("organic_matter", "organic_matter"),
    ("organicMatter", "organic_matter"),
    ("OrganicMatter", "organic_matter"),
    ("organicmatter", "organic_matter"),
    ("Organic Matter", "organic_matter"),
    ("OM", "organic_matter"),
    ("om", "organic_matter"),
    ("organic_carbon", "organic_matter"),
    ("organicCarbon", "organic_matter"),
    ("organiccarbon", "organic_matter"),
    ("Organic Carbon", "organic_matter"),
    ("OC", "organic_matter"),
    ("oc", "organic_matter"),
    ("electrical_conductivity", "electrical_conductivity"),
    ("electricalConductivity", "electrical_conductivity"),
    ("ElectricalConductivity", "electrical_conductivity"),
    ("electricalconductivity", "electrical_conductivity"),
    ("Electrical Conductivity", "electrical_conductivity"),
    ("conductivity", "electrical_conductivity"),
    ("Conductivity", "electrical_conductivity"),
    ("EC", "electrical_conductivity"),
    ("ec", "electrical_conductivity"),
    // Micronutrients
    ("sulphur", "sulphur"),
    ("Sulphur", "sulphur"),
    ("sulfur", "sulphur"),
    ("Sulfur", "sulphur"),
    ("S", "sulphur"),
    ("s", "sulphur"),
    ("zinc", "zinc"),
    ("Zinc", "zinc"),
    ("Zn", "zinc"),
    ("zn", "zinc"),
    ("ZN", "zinc"),
    ("iron", "iron"),
    ("Iron", "iron"),
    ("Fe", "iron"),
    ("fe", "iron"),
    ("FE", "iron"),
    ("copper", "copper"),
    ("Copper", "copper"),
    ("Cu", "copper"),
    ("cu", "copper"),
    ("CU", "copper"),
    ("manganese", "manganese"),
    ("Manganese", "manganese"),
    ("Mn", "manganese"),
    ("mn", "manganese"),
    ("MN", "manganese"),
    ("boron", "boron"),
    ("Boron", "boron"),
    ("B", "boron"),
    ("b", "boron"),
    // Environment
    ("moisture", "moisture"),
    ("Moisture", "moisture"),
    ("soil_moisture", "moisture"),
    ("soilMoisture", "moisture"),
    ("soilmoisture", "moisture"),
    ("Soil Moisture", "moisture"),
    ("water_content", "moisture"),
    ("watercontent", "moisture"),
    ("temperature", "temperature"),
    ("Temperature", "temperature"),
    ("TEMPERATURE", "temperature"),
    ("temp", "temperature"),
    ("Temp", "temperature"),
    ("soil_temp", "temperature"),
    ("soiltemp", "temperature"),
    ("humidity", "humidity"),
    ("Humidity", "humidity"),
    ("relative_humidity", "humidity"),
    ("relativehumidity", "humidity"),
    ("RH", "humidity"),
    ("rainfall", "rainfall"),
    ("Rainfall", "rainfall"),
    ("rain", "rainfall"),
    ("Rain", "rainfall"),
    ("precipitation", "rainfall"),
    ("Precipitation", "rainfall"),
    // Soil classification
    ("soil_type", "soil_type"),
    ("soilType", "soil_type"),
    ("SoilType", "soil_type"),
    ("soiltype", "soil_type"),
    ("Soil Type", "soil_type"),
    ("Soil_Type", "soil_type"),
    ("soil type", "soil_type"),
    ("soil_type_name", "soil_type"),
    ("soiltype_name", "soil_type"),
    ("soil_name", "soil_type"),
    ("soil_class", "soil_type"),
    ("soil_classification", "soil_type"),
    ("soil_category", "soil_type"),
    ("texture", "soil_type"),
    ("Texture", "soil_type"),
    ("soil", "soil_type"),
    ("Soil", "soil_type"),
    // Training target
    ("productivity_score", "productivity_score"),
    ("productivityScore", "productivity_score"),
    ("productivity", "productivity_score"),
    ("Productivity", "productivity_score"),
    ("yield", "productivity_score"),
    ("Yield", "productivity_score"),
    ("crop_yield", "productivity_score"),
];

static ALIAS_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| FEATURE_ALIASES.iter().copied().collect());

/// Resolve an input key to its canonical name, if the key is a known alias.
pub fn canonical_name(key: &str) -> Option<&'static str> {
    ALIAS_INDEX.get(key).copied()
}

/// All accepted spellings of a canonical name, in table order.
pub fn aliases_of(canonical: &str) -> impl Iterator<Item = &'static str> + '_ {
    FEATURE_ALIASES
        .iter()
        .filter(move |(_, target)| *target == canonical)
        .map(|(alias, _)| *alias)
}

/// Every canonical name the table can produce.
pub fn canonical_names() -> impl Iterator<Item = &'static str> {
    NUMERIC_FEATURES
        .iter()
        .copied()
        .chain([SOIL_TYPE, PRODUCTIVITY_SCORE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_canonical_name_maps_to_itself() {
        for name in canonical_names() {
            assert_eq!(canonical_name(name), Some(name), "{} is not self-aliased", name);
        }
    }

    #[test]
    fn test_aliases_are_unique() {
        let mut seen = HashSet::new();
        for (alias, _) in FEATURE_ALIASES {
            assert!(seen.insert(*alias), "alias {:?} listed twice", alias);
        }
    }

    #[test]
    fn test_targets_are_canonical() {
        let canonical: HashSet<_> = canonical_names().collect();
        for (alias, target) in FEATURE_ALIASES {
            assert!(canonical.contains(target), "{} -> {} is not canonical", alias, target);
        }
    }

    #[test]
    fn test_case_variants_are_not_folded() {
        assert_eq!(canonical_name("Temp"), Some("temperature"));
        assert_eq!(canonical_name("temp"), Some("temperature"));
        assert_eq!(canonical_name("TEMP"), None);
        assert_eq!(canonical_name("NiTrOgEn"), None);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(canonical_name("N"), Some("nitrogen"));
        assert_eq!(canonical_name("EC"), Some("electrical_conductivity"));
        assert_eq!(canonical_name("OC"), Some("organic_matter"));
        assert_eq!(canonical_name("Soil Type"), Some("soil_type"));
        assert_eq!(canonical_name("yield"), Some("productivity_score"));
    }

    #[test]
    fn test_aliases_of() {
        let temps: Vec<_> = aliases_of("temperature").collect();
        assert!(temps.contains(&"Temperature"));
        assert!(temps.contains(&"temp"));
        assert!(temps.contains(&"Temp"));
        assert!(!temps.contains(&"humidity"));
    }
}
