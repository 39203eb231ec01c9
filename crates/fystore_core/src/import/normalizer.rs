//! Row normalization for spreadsheet exports.
//!
//! # Invariants
//! - Never fails: unknown or malformed fields fall back to `""` or `None`.
//! - Pure and deterministic; the same input always yields the same row.

use crate::model::table_row::TableRow;
use serde_json::{Map, Value};

/// Source column names as they appear in the exported sheets.
mod source {
    pub const SERIAL: &str = "Sl No";
    pub const CAPACITY: &str = "Capacity";
    pub const GROUP: &str = "Group";
    pub const PPA_MERCHANT: &str = "PPA/Merchant";
    pub const KIND: &str = "Type";
    pub const SOLAR: &str = "Solar";
    pub const WIND: &str = "Wind";
    pub const SPV: &str = "SPV";
    pub const LOCATION_CODE: &str = "Location Code";
    pub const LOCATION: &str = "Location";
    /// The substation column is spelled differently across sheets.
    pub const PSS: [&str; 3] = ["PSS", "PSS -", "PSS-"];
    pub const CONNECTIVITY: &str = "Connectivity";
}

/// Normalizes the source row at zero-based `index` of its batch.
pub fn normalize_row(raw: &Value, index: usize) -> TableRow {
    let position = i64::try_from(index).map_or(i64::MAX, |index| index.saturating_add(1));
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    TableRow {
        id: position,
        sno: serial_number(fields.get(source::SERIAL)).unwrap_or(position),
        capacity: number(fields.get(source::CAPACITY)),
        group: text(fields.get(source::GROUP)),
        ppa_merchant: text(fields.get(source::PPA_MERCHANT)),
        kind: text(fields.get(source::KIND)),
        solar: number(fields.get(source::SOLAR)),
        wind: number(fields.get(source::WIND)),
        spv: text(fields.get(source::SPV)),
        location_code: text(fields.get(source::LOCATION_CODE)),
        location: text(fields.get(source::LOCATION)),
        pss: source::PSS
            .iter()
            .map(|key| text(fields.get(*key)))
            .find(|value| !value.is_empty())
            .unwrap_or_default(),
        connectivity: text(fields.get(source::CONNECTIVITY)),
    }
}

/// Normalizes a whole batch, numbering rows from 1.
pub fn normalize_rows(raw_rows: &[Value]) -> Vec<TableRow> {
    raw_rows
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_row(raw, index))
        .collect()
}

/// Numbers and numeric strings; anything else is missing.
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn serial_number(value: Option<&Value>) -> Option<i64> {
    let serial = number(value)?;
    // Saturating float-to-int cast; sheets carry small serials.
    (serial >= 1.0).then_some(serial.trunc() as i64)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_row, normalize_rows};
    use serde_json::json;

    #[test]
    fn maps_source_columns_onto_canonical_fields() {
        let row = normalize_row(
            &json!({
                "Sl No": 7,
                "Capacity": 250.5,
                "Group": "AGEL",
                "PPA/Merchant": "PPA",
                "Type": "Hybrid",
                "Solar": "150",
                "Wind": 100,
                "SPV": "AGE23L",
                "Location Code": "RJ",
                "Location": "Baap",
                "PSS": "PSS-4",
                "Connectivity": "CTU"
            }),
            0,
        );

        assert_eq!(row.id, 1);
        assert_eq!(row.sno, 7);
        assert_eq!(row.capacity, Some(250.5));
        assert_eq!(row.group, "AGEL");
        assert_eq!(row.ppa_merchant, "PPA");
        assert_eq!(row.kind, "Hybrid");
        assert_eq!(row.solar, Some(150.0));
        assert_eq!(row.wind, Some(100.0));
        assert_eq!(row.spv, "AGE23L");
        assert_eq!(row.location_code, "RJ");
        assert_eq!(row.location, "Baap");
        assert_eq!(row.pss, "PSS-4");
        assert_eq!(row.connectivity, "CTU");
    }

    #[test]
    fn pss_is_read_from_alternate_spellings() {
        assert_eq!(normalize_row(&json!({"PSS -": "KPS1"}), 0).pss, "KPS1");
        assert_eq!(normalize_row(&json!({"PSS-": "KPS2"}), 0).pss, "KPS2");
        assert_eq!(
            normalize_row(&json!({"PSS": "", "PSS-": "KPS3"}), 0).pss,
            "KPS3"
        );
        assert_eq!(normalize_row(&json!({}), 0).pss, "");
    }

    #[test]
    fn malformed_numbers_become_missing_instead_of_failing() {
        let row = normalize_row(
            &json!({"Capacity": "n/a", "Solar": null, "Wind": [1], "Sl No": "x"}),
            4,
        );
        assert_eq!(row.capacity, None);
        assert_eq!(row.solar, None);
        assert_eq!(row.wind, None);
        assert_eq!(row.sno, 5);
        assert_eq!(row.id, 5);
    }

    #[test]
    fn non_object_rows_yield_defaults() {
        let row = normalize_row(&json!("not a row"), 2);
        assert_eq!(row.id, 3);
        assert_eq!(row.sno, 3);
        assert_eq!(row.group, "");
        assert_eq!(row.capacity, None);
    }

    #[test]
    fn normalizing_is_deterministic() {
        let raw = vec![json!({"Group": "ACL", "Capacity": "12"}), json!({"Type": "Wind"})];
        let first = normalize_rows(&raw);
        assert_eq!(first, normalize_rows(&raw));
        assert_eq!(first[1].id, 2);
        assert_eq!(first[0].capacity, Some(12.0));
    }

    #[test]
    fn missing_numbers_serialize_as_null() {
        let encoded = serde_json::to_value(normalize_row(&json!({}), 0)).unwrap();
        assert_eq!(encoded["capacity"], json!(null));
        assert_eq!(encoded["type"], json!(""));
        assert_eq!(encoded["ppaMerchant"], json!(""));
    }
}
