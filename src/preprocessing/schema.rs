use crate::preprocessing::aliases::{NUMERIC_FEATURES, SOIL_TYPE_PREFIX};
use crate::preprocessing::error::AlignError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Column layout a trained model expects at inference time.
///
/// Built once from the model's feature order and never mutated. Columns named
/// `soil_type_<category>` are one-hot indicators; every other column is a
/// required numeric feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TrainedSchema {
    feature_order: Vec<String>,
    numeric: Vec<(String, usize)>,
    categories: Vec<String>,
    indicator_index: HashMap<String, usize>,
}

impl TrainedSchema {
    /// Derive the schema from an ordered feature list.
    pub fn from_feature_order(feature_order: Vec<String>) -> Result<Self, AlignError> {
        if feature_order.is_empty() {
            return Err(AlignError::ModelNotReady(
                "trained feature order is empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut numeric = Vec::new();
        let mut categories = Vec::new();
        let mut indicator_index = HashMap::new();

        for (idx, column) in feature_order.iter().enumerate() {
            if !seen.insert(column.as_str()) {
                return Err(AlignError::ModelNotReady(format!(
                    "trained feature order repeats column {}",
                    column
                )));
            }

            match column.strip_prefix(SOIL_TYPE_PREFIX) {
                Some(category) => {
                    categories.push(category.to_string());
                    indicator_index.insert(category.to_string(), idx);
                }
                None => numeric.push((column.clone(), idx)),
            }
        }

        Ok(Self {
            feature_order,
            numeric,
            categories,
            indicator_index,
        })
    }

    /// Layout used by training: numeric features in canonical order followed
    /// by one indicator per category, categories sorted.
    pub fn for_training<'a, N, C>(numeric: N, categories: C) -> Result<Self, AlignError>
    where
        N: IntoIterator<Item = &'a str>,
        C: IntoIterator<Item = String>,
    {
        let sorted: BTreeSet<String> = categories.into_iter().collect();
        let order = numeric
            .into_iter()
            .map(str::to_string)
            .chain(sorted.iter().map(|c| indicator_column(c)))
            .collect();
        Self::from_feature_order(order)
    }

    /// The full canonical layout for a category set.
    pub fn canonical<C>(categories: C) -> Result<Self, AlignError>
    where
        C: IntoIterator<Item = String>,
    {
        Self::for_training(NUMERIC_FEATURES, categories)
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// Number of columns in an aligned row.
    pub fn width(&self) -> usize {
        self.feature_order.len()
    }

    /// Required numeric features with their column positions, in trained order.
    pub fn numeric_columns(&self) -> &[(String, usize)] {
        &self.numeric
    }

    pub fn numeric_features(&self) -> impl Iterator<Item = &str> {
        self.numeric.iter().map(|(name, _)| name.as_str())
    }

    /// Trained soil-type categories, in trained order.
    pub fn soil_categories(&self) -> &[String] {
        &self.categories
    }

    /// Column position of a category's indicator, if the category was trained.
    pub fn indicator_position(&self, category: &str) -> Option<usize> {
        self.indicator_index.get(category).copied()
    }
}

impl TryFrom<Vec<String>> for TrainedSchema {
    type Error = AlignError;

    fn try_from(feature_order: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_feature_order(feature_order)
    }
}

impl From<TrainedSchema> for Vec<String> {
    fn from(schema: TrainedSchema) -> Self {
        schema.feature_order
    }
}

/// Indicator column name for a soil-type category.
pub fn indicator_column(category: &str) -> String {
    format!("{}{}", SOIL_TYPE_PREFIX, category)
}
