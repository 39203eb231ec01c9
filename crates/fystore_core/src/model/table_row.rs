//! Canonical row shape of the tabular dataset.

use serde::{Deserialize, Serialize};

/// One project row of the fiscal-year table.
///
/// Missing numeric values are `None` and serialize as `null`; missing text
/// values are empty strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// 1-based position in the imported batch.
    pub id: i64,
    /// Serial number as printed in the source sheet.
    pub sno: i64,
    /// Installed capacity in MW.
    pub capacity: Option<f64>,
    pub group: String,
    /// Contract type, e.g. `PPA` or `Merchant`.
    pub ppa_merchant: String,
    /// Generation type, e.g. `Solar`, `Wind`, `Hybrid`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Solar share of a hybrid capacity.
    pub solar: Option<f64>,
    /// Wind share of a hybrid capacity.
    pub wind: Option<f64>,
    /// Special-purpose-vehicle name.
    pub spv: String,
    pub location_code: String,
    pub location: String,
    /// Pooling substation.
    pub pss: String,
    pub connectivity: String,
}
