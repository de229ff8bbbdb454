use chrono::{DateTime, Duration, Utc};

/// A single cell of a provider table. Upstream payloads mix missing values,
/// lap/sector durations, wall-clock timestamps, flags, numerics and plain
/// text, so every cell is carried as one of these variants until the
/// serializer flattens it to JSON.
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

// -0.0 and 0.0 compare equal, NaN compares equal to NaN. Stint numbers are
// float-typed, so grouping keys need a total equality over floats.
fn float_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Duration(a), CellValue::Duration(b)) => a == b,
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => float_bits(*a) == float_bits(*b),
            (CellValue::Str(a), CellValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Plain-text rendering of scalar cells, used where the response embeds
    /// a cell outside a normalized row (driver number, team name).
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Str(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }
}

/// An immutable, ordered table: column names plus positional rows. Column
/// order and row order are the provider's and are preserved all the way to
/// the JSON output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in the first row, if the table has any rows.
    pub fn first_value(&self, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.first().and_then(|row| row.get(idx))
    }

    /// Splits rows into sub-tables by their value in `column`, one group per
    /// distinct value in first-seen order. Rows keep their source order
    /// inside each group; nothing is sorted. Unknown columns yield no
    /// groups.
    pub fn partition_by(&self, column: &str) -> Vec<(CellValue, Table)> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut groups: Vec<(CellValue, Table)> = Vec::new();
        for row in &self.rows {
            let key = &row[idx];
            match groups.iter_mut().find(|(k, _)| k == key) {
                Some((_, table)) => table.rows.push(row.clone()),
                None => {
                    let mut table = Table::new(self.columns.clone());
                    table.rows.push(row.clone());
                    groups.push((key.clone(), table));
                }
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap_table() -> Table {
        let mut table = Table::new(vec![
            "Driver".to_string(),
            "Stint".to_string(),
            "LapNumber".to_string(),
        ]);
        for (driver, stint, lap) in [
            ("VER", 1.0, 1),
            ("HAM", 1.0, 1),
            ("VER", 1.0, 2),
            ("VER", 2.0, 3),
            ("HAM", 1.0, 2),
        ] {
            table.push_row(vec![
                CellValue::Str(driver.to_string()),
                CellValue::Float(stint),
                CellValue::Int(lap),
            ]);
        }
        table
    }

    #[test]
    fn partition_keeps_first_seen_driver_order() {
        let groups = lap_table().partition_by("Driver");
        let keys: Vec<String> = groups.iter().map(|(k, _)| k.display_string()).collect();
        assert_eq!(keys, vec!["VER", "HAM"]);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn partition_preserves_row_order_within_groups() {
        let groups = lap_table().partition_by("Driver");
        let ver_laps: Vec<i64> = groups[0]
            .1
            .rows()
            .iter()
            .map(|row| match row[2] {
                CellValue::Int(lap) => lap,
                _ => panic!("lap number should be an integer"),
            })
            .collect();
        assert_eq!(ver_laps, vec![1, 2, 3]);
    }

    #[test]
    fn partition_groups_float_stints() {
        let groups = lap_table().partition_by("Driver");
        let stints = groups[0].1.partition_by("Stint");
        assert_eq!(stints.len(), 2);
        assert_eq!(stints[0].0, CellValue::Float(1.0));
        assert_eq!(stints[1].0, CellValue::Float(2.0));
        assert_eq!(stints[0].1.len(), 2);
        assert_eq!(stints[1].1.len(), 1);
    }

    #[test]
    fn partition_on_unknown_column_is_empty() {
        assert!(lap_table().partition_by("Team").is_empty());
    }

    #[test]
    fn empty_table_has_no_groups() {
        let table = Table::new(vec!["Driver".to_string()]);
        assert!(table.partition_by("Driver").is_empty());
        assert!(table.is_empty());
        assert!(table.first_value("Driver").is_none());
    }

    #[test]
    fn first_value_reads_the_first_row() {
        let table = lap_table();
        assert_eq!(
            table.first_value("Driver"),
            Some(&CellValue::Str("VER".to_string()))
        );
    }

    #[test]
    fn float_equality_is_total() {
        assert_eq!(CellValue::Float(f64::NAN), CellValue::Float(f64::NAN));
        assert_eq!(CellValue::Float(0.0), CellValue::Float(-0.0));
        assert_ne!(CellValue::Float(1.0), CellValue::Int(1));
    }
}
