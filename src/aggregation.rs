//! Group-by weighted means over the housing tables.
//!
//! Every housing statistic is the same operation with different columns:
//! group, sum the weights into `Total`, and divide the weighted sum of the
//! value by that total. A zero total yields 0 rather than NaN.

use polars::prelude::*;
use tracing::debug;

use crate::error::AnalysisError;
use crate::schema::housing;
use crate::table::{require_columns, sort_by};

/// A group-by weighted mean: which keys, which value, weighted by what.
#[derive(Debug, Clone)]
pub struct WeightedMean {
    pub group_by: Vec<String>,
    pub value: String,
    pub weight: String,
    pub alias: String,
}

impl WeightedMean {
    pub fn new(group_by: &[&str], value: &str, weight: &str, alias: &str) -> Self {
        Self {
            group_by: group_by.iter().map(|g| g.to_string()).collect(),
            value: value.to_string(),
            weight: weight.to_string(),
            alias: alias.to_string(),
        }
    }

    /// One row per group: the group keys, `Total` and the weighted mean,
    /// sorted by the keys.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, AnalysisError> {
        let mut needed: Vec<&str> = self.group_by.iter().map(String::as_str).collect();
        needed.push(&self.value);
        needed.push(&self.weight);
        require_columns(df, &needed)?;

        let keys: Vec<Expr> = self.group_by.iter().map(|k| col(k.as_str())).collect();
        let value = col(self.value.as_str()).cast(DataType::Float64);
        let weight = col(self.weight.as_str()).cast(DataType::Float64);
        let total = weight.clone().sum();

        let grouped = df
            .clone()
            .lazy()
            .group_by(keys)
            .agg([
                total.clone().alias(housing::TOTAL),
                when(total.clone().eq(lit(0.0)))
                    .then(lit(0.0))
                    .otherwise((value * weight).sum() / total)
                    .alias(self.alias.as_str()),
            ])
            .collect()?;

        debug!(alias = %self.alias, groups = grouped.height(), "weighted mean");
        let order: Vec<&str> = self.group_by.iter().map(String::as_str).collect();
        sort_by(grouped, &order)
    }
}

const STRUCTURE_KEYS: [&str; 3] = [
    housing::REGION,
    housing::DWELLING_STRUCTURE,
    housing::CENSUS_YEAR,
];

/// Average bedroom count per (Region, Dwelling Structure, Census year),
/// weighted by the number of dwellings.
pub fn average_bedrooms(dwellings: &DataFrame) -> Result<DataFrame, AnalysisError> {
    WeightedMean::new(
        &STRUCTURE_KEYS,
        housing::BEDROOMS,
        housing::VALUE,
        housing::AVERAGE_BEDROOMS,
    )
    .apply(dwellings)
}

/// Weighted mean weekly rent per (Region, Dwelling Structure, Census year),
/// divided by the group's average bedrooms. Groups with no bedroom data, or
/// an average of zero, get 0.
pub fn mean_rent_per_dwelling(
    rent: &DataFrame,
    avg_bedrooms: &DataFrame,
) -> Result<DataFrame, AnalysisError> {
    const MEAN_RENT: &str = "Mean weekly rent";
    let by_structure =
        WeightedMean::new(&STRUCTURE_KEYS, housing::WEEKLY_RENT, housing::VALUE, MEAN_RENT)
            .apply(rent)?;

    require_columns(avg_bedrooms, &[housing::AVERAGE_BEDROOMS])?;
    let keys: Vec<Expr> = STRUCTURE_KEYS.iter().map(|k| col(*k)).collect();
    let bedrooms = avg_bedrooms.clone().lazy().select(
        STRUCTURE_KEYS
            .iter()
            .map(|k| col(*k))
            .chain([col(housing::AVERAGE_BEDROOMS)])
            .collect::<Vec<_>>(),
    );

    let avg = col(housing::AVERAGE_BEDROOMS);
    let joined = by_structure
        .lazy()
        .join(bedrooms, keys.clone(), keys, JoinArgs::new(JoinType::Left))
        .with_column(
            when(avg.clone().is_null().or(avg.clone().eq(lit(0.0))))
                .then(lit(0.0))
                .otherwise(col(MEAN_RENT) / avg)
                .alias(housing::MEAN_RENT_PER_DWELLING),
        )
        .select([
            col(housing::REGION),
            col(housing::DWELLING_STRUCTURE),
            col(housing::CENSUS_YEAR),
            col(housing::TOTAL),
            col(housing::MEAN_RENT_PER_DWELLING),
        ])
        .collect()?;
    sort_by(joined, &STRUCTURE_KEYS)
}

/// Mean rent per person per (Region, Census year), weighted by the rental
/// total of each dwelling structure.
pub fn mean_rent_per_person(per_dwelling: &DataFrame) -> Result<DataFrame, AnalysisError> {
    WeightedMean::new(
        &[housing::REGION, housing::CENSUS_YEAR],
        housing::MEAN_RENT_PER_DWELLING,
        housing::TOTAL,
        housing::MEAN_RENT_PER_PERSON,
    )
    .apply(per_dwelling)
}
