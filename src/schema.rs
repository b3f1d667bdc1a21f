/// Column-name constants for the SA2 datasets.
/// Single source of truth - loaders, aggregations and reports all use these.

// ── Region key ──────────────────────────────────────────────────────────────
pub mod region {
    pub const SA2_CODE: &str = "SA2 Code";
    /// Header of the key column as it arrives from metadata-renamed files.
    pub const SA2_CODE_RAW: &str = "SA2 Code (ASGS 2016).";
}

// ── Income columns ──────────────────────────────────────────────────────────
pub mod income {
    pub const RAW_SA2_CODE: &str = "sa2_maincode_2016";
    pub const RAW_WEEKLY_INCOME: &str =
        "equivalised_total_household_income_census_median_weekly";
    pub const WEEKLY_INCOME: &str = "Weekly Household Income";
    pub const NULL_MARKER: &str = "null";
}

// ── LIHS / AEDC columns ─────────────────────────────────────────────────────
pub mod lihs {
    /// Housekeeping column that must never be ranked as a metric.
    pub const YEAR: &str = "Year";
    pub const PERCENT_MARKER: &str = "(%)";
    pub const DOMAIN_PREFIX: &str = "AEDC - ";
}

// ── AEDC long form ──────────────────────────────────────────────────────────
pub mod aedc {
    pub const SA2_MAIN_CODE: &str = "SA2 Main Code";
    pub const STATUS: &str = "Status";
    pub const YEAR: &str = "Year";
    pub const PERCENTAGE: &str = "Percentage";
    pub const DOMAIN: &str = "Domain";
}

// ── Rent / dwelling columns ─────────────────────────────────────────────────
pub mod housing {
    pub const REGION: &str = "Region";
    pub const DWELLING_STRUCTURE: &str = "Dwelling Structure";
    pub const CENSUS_YEAR: &str = "Census year";
    pub const VALUE: &str = "Value";
    pub const BEDROOMS: &str = "Number of Bedrooms";
    pub const WEEKLY_RENT: &str = "Rent (weekly)";

    pub const TOTAL: &str = "Total";
    pub const AVERAGE_BEDROOMS: &str = "Average Bedrooms";
    pub const MEAN_RENT_PER_DWELLING: &str = "Mean rent per dwelling";
    pub const MEAN_RENT_PER_PERSON: &str = "Mean rent per person";

    /// Category values that mean "no usable category" in the ABS extracts.
    pub const SENTINELS: [&str; 4] = [
        "Total",
        "Not stated",
        "None (includes bedsitters)",
        "Nil payments",
    ];
}

// ── Cost of living columns ──────────────────────────────────────────────────
pub mod cost_of_living {
    pub const YOUTH_ALLOWANCE: &str = "Cost of living proportion (Youth Allowance)";
    pub const NEWSTART: &str = "Cost of living proportion (Newstart)";
}

// ── CPI columns ─────────────────────────────────────────────────────────────
pub mod cpi {
    pub const PERCENTAGE_INCREASE: &str = "Percentage increase";
}

// ── Correlation report columns ──────────────────────────────────────────────
pub mod correlation {
    pub const METRIC: &str = "LIHS Metric";
    pub const STRENGTH: &str = "Correlation Strength";
}
