use chrono::{Duration, SecondsFormat};
use serde_json::{Map, Number, Value};

use crate::models::table::{CellValue, Table};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Converts a table to a list of JSON objects, one per row, keeping row and
/// column order. Cell conversion handles the provider's mixed value types
/// so the result is always JSON-safe.
pub fn serialize_rows(table: &Table) -> Vec<Map<String, Value>> {
    let mut records = Vec::with_capacity(table.len());
    for row in table.rows() {
        let mut record = Map::new();
        for (name, cell) in table.columns().iter().zip(row) {
            record.insert(name.clone(), cell_to_json(cell));
        }
        records.push(record);
    }
    records
}

pub fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Duration(d) => Value::String(format_timedelta(*d)),
        CellValue::Timestamp(ts) => {
            Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, false))
        }
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Str(s) => Value::String(s.clone()),
    }
}

/// Renders a duration the way pandas prints a `Timedelta`, e.g.
/// `0 days 00:01:23.456000`. Negative durations get a floored day count and
/// a positive clock remainder: `-1 days +23:59:59`. The fractional part is
/// only printed when non-zero.
pub fn format_timedelta(duration: Duration) -> String {
    let micros = duration
        .num_microseconds()
        .unwrap_or_else(|| duration.num_milliseconds().saturating_mul(1_000));
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);
    let hours = rem / MICROS_PER_HOUR;
    let minutes = rem % MICROS_PER_HOUR / MICROS_PER_MINUTE;
    let seconds = rem % MICROS_PER_MINUTE / MICROS_PER_SECOND;
    let frac = rem % MICROS_PER_SECOND;

    let sign = if days < 0 { "+" } else { "" };
    let mut out = format!("{days} days {sign}{hours:02}:{minutes:02}:{seconds:02}");
    if frac != 0 {
        out.push_str(&format!(".{frac:06}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("timestamp in range")
    }

    #[test]
    fn timedelta_matches_pandas_repr() {
        let cases = [
            (Duration::microseconds(83_456_000), "0 days 00:01:23.456000"),
            (Duration::seconds(83), "0 days 00:01:23"),
            (Duration::seconds(0), "0 days 00:00:00"),
            (
                Duration::seconds(3 * 86_400 + 7_200 + 63),
                "3 days 02:01:03",
            ),
            (Duration::seconds(-1), "-1 days +23:59:59"),
            (
                Duration::microseconds(-1_500_000),
                "-1 days +23:59:58.500000",
            ),
        ];
        for (duration, expected) in cases {
            assert_eq!(format_timedelta(duration), expected);
        }
    }

    #[test]
    fn cells_convert_by_kind() {
        assert_eq!(cell_to_json(&CellValue::Null), Value::Null);
        assert_eq!(
            cell_to_json(&CellValue::Duration(Duration::milliseconds(93_500))),
            Value::String("0 days 00:01:33.500000".to_string())
        );
        assert_eq!(
            cell_to_json(&CellValue::Timestamp(ts(1_694_871_067))),
            Value::String("2023-09-16T13:31:07.000000+00:00".to_string())
        );
        assert_eq!(cell_to_json(&CellValue::Bool(true)), Value::Bool(true));
        assert_eq!(cell_to_json(&CellValue::Int(44)), Value::from(44));
        assert_eq!(cell_to_json(&CellValue::Float(2.0)), Value::from(2.0));
        assert_eq!(
            cell_to_json(&CellValue::Str("SOFT".to_string())),
            Value::from("SOFT")
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(cell_to_json(&CellValue::Float(f64::NAN)), Value::Null);
        assert_eq!(cell_to_json(&CellValue::Float(f64::INFINITY)), Value::Null);
    }

    #[test]
    fn numeric_cells_keep_their_value() {
        let int = cell_to_json(&CellValue::Int(16));
        let float = cell_to_json(&CellValue::Float(2.5));
        assert_eq!(int.as_f64(), Some(16.0));
        assert_eq!(float.as_f64(), Some(2.5));
    }

    #[test]
    fn empty_table_serializes_to_empty_list() {
        let table = Table::new(vec!["Driver".to_string()]);
        assert!(serialize_rows(&table).is_empty());
    }

    #[test]
    fn rows_keep_column_order() {
        let mut table = Table::new(vec![
            "Driver".to_string(),
            "LapTime".to_string(),
            "SpeedST".to_string(),
        ]);
        table.push_row(vec![
            CellValue::Str("LEC".to_string()),
            CellValue::Null,
            CellValue::Int(312),
        ]);
        let records = serialize_rows(&table);
        assert_eq!(records.len(), 1);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["Driver", "LapTime", "SpeedST"]);
        assert_eq!(records[0]["LapTime"], Value::Null);
    }

    // Maps normalized JSON scalars back into cells; used to check that a
    // second normalization pass changes nothing.
    fn cell_from_json(value: &Value) -> CellValue {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => CellValue::Str(s.clone()),
            _ => CellValue::Null,
        }
    }

    fn table_from_records(columns: &[String], records: &[Map<String, Value>]) -> Table {
        let mut table = Table::new(columns.to_vec());
        for record in records {
            table.push_row(columns.iter().map(|c| cell_from_json(&record[c])).collect());
        }
        table
    }

    fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Null),
            (-2 * MICROS_PER_DAY..2 * MICROS_PER_DAY)
                .prop_map(|us| CellValue::Duration(Duration::microseconds(us))),
            (0i64..4_102_444_800).prop_map(|secs| CellValue::Timestamp(ts(secs))),
            any::<bool>().prop_map(CellValue::Bool),
            any::<i64>().prop_map(CellValue::Int),
            (-1.0e9f64..1.0e9).prop_map(CellValue::Float),
            "[A-Za-z0-9 ]{0,12}".prop_map(CellValue::Str),
        ]
    }

    fn arb_table() -> impl Strategy<Value = Table> {
        (1usize..6).prop_flat_map(|width| {
            let columns: Vec<String> = (0..width).map(|i| format!("Col{i}")).collect();
            proptest::collection::vec(proptest::collection::vec(arb_cell(), width), 0..12)
                .prop_map(move |rows| {
                    let mut table = Table::new(columns.clone());
                    for row in rows {
                        table.push_row(row);
                    }
                    table
                })
        })
    }

    proptest! {
        #[test]
        fn normalizing_preserves_shape_and_kinds(table in arb_table()) {
            let records = serialize_rows(&table);
            prop_assert_eq!(records.len(), table.len());
            for (record, row) in records.iter().zip(table.rows()) {
                let keys: Vec<&String> = record.keys().collect();
                let columns: Vec<&String> = table.columns().iter().collect();
                prop_assert_eq!(keys, columns);
                for (cell, value) in row.iter().zip(record.values()) {
                    match cell {
                        CellValue::Null => prop_assert!(value.is_null()),
                        CellValue::Duration(_) => prop_assert!(value.is_string()),
                        CellValue::Timestamp(_) => prop_assert!(value.is_string()),
                        CellValue::Bool(_) => prop_assert!(value.is_boolean()),
                        CellValue::Int(i) => prop_assert_eq!(value.as_i64(), Some(*i)),
                        CellValue::Float(f) => prop_assert_eq!(value.as_f64(), Some(*f)),
                        CellValue::Str(s) => prop_assert_eq!(value.as_str(), Some(s.as_str())),
                    }
                }
            }
        }

        #[test]
        fn renormalizing_normalized_rows_is_a_noop(table in arb_table()) {
            let once = serialize_rows(&table);
            let replayed = table_from_records(table.columns(), &once);
            let twice = serialize_rows(&replayed);
            prop_assert_eq!(once, twice);
        }
    }
}
