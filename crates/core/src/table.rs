use std::sync::Arc;

use crate::error::CoreError;
use crate::header::ColumnHeader;
use crate::value::{CellValue, ColumnType};

/// One column of a [`Table`].
///
/// Cell storage sits behind an `Arc` so cloning a table is shallow; any write
/// goes through `Arc::make_mut`, which copies the cells first if they are
/// shared with another table.
#[derive(Debug, Clone)]
pub struct Column {
    header: ColumnHeader,
    dtype: ColumnType,
    values: Arc<Vec<CellValue>>,
}

/// Float columns hold no integer cells, matching what pandas stores.
fn widen_integers(values: &mut [CellValue], dtype: ColumnType) {
    if dtype != ColumnType::Float {
        return;
    }
    for value in values.iter_mut() {
        if let CellValue::Integer(n) = value {
            *value = CellValue::Float(*n as f64);
        }
    }
}

impl Column {
    pub fn new(header: ColumnHeader, mut values: Vec<CellValue>) -> Self {
        let dtype = ColumnType::infer(&values);
        widen_integers(&mut values, dtype);
        Self {
            header,
            dtype,
            values: Arc::new(values),
        }
    }

    pub fn header(&self) -> &ColumnHeader {
        &self.header
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// True when both columns point at the same cell storage.
    pub fn shares_storage_with(&self, other: &Column) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.dtype == other.dtype && self.values == other.values
    }
}

impl Eq for Column {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<(ColumnHeader, Vec<CellValue>)>) -> Result<Self, CoreError> {
        let num_rows = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            num_rows,
        };
        for (header, values) in columns {
            if values.len() != num_rows {
                return Err(CoreError::InvalidData(format!(
                    "column {header} has {} rows, expected {num_rows}",
                    values.len()
                )));
            }
            if table.column_index(&header).is_some() {
                return Err(CoreError::DuplicateHeader(header.to_string()));
            }
            table.columns.push(Column::new(header, values));
        }
        Ok(table)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<ColumnHeader> {
        self.columns.iter().map(|c| c.header.clone()).collect()
    }

    pub fn column_index(&self, header: &ColumnHeader) -> Option<usize> {
        self.columns.iter().position(|c| &c.header == header)
    }

    pub fn column(&self, header: &ColumnHeader) -> Result<&Column, CoreError> {
        self.columns
            .iter()
            .find(|c| &c.header == header)
            .ok_or_else(|| CoreError::NotFound(format!("column {header}")))
    }

    fn column_mut(&mut self, header: &ColumnHeader) -> Result<&mut Column, CoreError> {
        self.columns
            .iter_mut()
            .find(|c| &c.header == header)
            .ok_or_else(|| CoreError::NotFound(format!("column {header}")))
    }

    pub fn rename_column(&mut self, from: &ColumnHeader, to: ColumnHeader) -> Result<(), CoreError> {
        if from == &to {
            return Ok(());
        }
        if self.column_index(&to).is_some() {
            return Err(CoreError::DuplicateHeader(to.to_string()));
        }
        self.column_mut(from)?.header = to;
        Ok(())
    }

    /// Apply several renames at once. Headers not present are ignored.
    pub fn rename_columns(&mut self, renames: &[(ColumnHeader, ColumnHeader)]) -> Result<(), CoreError> {
        let renamed: Vec<ColumnHeader> = self
            .columns
            .iter()
            .map(|c| {
                renames
                    .iter()
                    .find(|(from, _)| from == &c.header)
                    .map(|(_, to)| to.clone())
                    .unwrap_or_else(|| c.header.clone())
            })
            .collect();
        for (i, header) in renamed.iter().enumerate() {
            if renamed[..i].contains(header) {
                return Err(CoreError::DuplicateHeader(header.to_string()));
            }
        }
        for (column, header) in self.columns.iter_mut().zip(renamed) {
            column.header = header;
        }
        Ok(())
    }

    pub fn drop_column(&mut self, header: &ColumnHeader) -> Result<Column, CoreError> {
        let index = self
            .column_index(header)
            .ok_or_else(|| CoreError::NotFound(format!("column {header}")))?;
        Ok(self.columns.remove(index))
    }

    /// Insert a column filled with `fill`. An index past the end appends.
    pub fn insert_column(
        &mut self,
        index: usize,
        header: ColumnHeader,
        fill: CellValue,
    ) -> Result<(), CoreError> {
        if self.column_index(&header).is_some() {
            return Err(CoreError::DuplicateHeader(header.to_string()));
        }
        let column = Column::new(header, vec![fill; self.num_rows]);
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        Ok(())
    }

    /// Move a column to `index`, clamped to the last position.
    pub fn move_column(&mut self, header: &ColumnHeader, index: usize) -> Result<(), CoreError> {
        let from = self
            .column_index(header)
            .ok_or_else(|| CoreError::NotFound(format!("column {header}")))?;
        let column = self.columns.remove(from);
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        Ok(())
    }

    /// Keep only the rows whose mask entry is true.
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<(), CoreError> {
        if mask.len() != self.num_rows {
            return Err(CoreError::InvalidData(format!(
                "row mask has {} entries, table has {} rows",
                mask.len(),
                self.num_rows
            )));
        }
        if mask.iter().all(|keep| *keep) {
            return Ok(());
        }
        for column in &mut self.columns {
            let kept: Vec<CellValue> = column
                .values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(value, _)| value.clone())
                .collect();
            column.values = Arc::new(kept);
        }
        self.num_rows = mask.iter().filter(|keep| **keep).count();
        Ok(())
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        header: &ColumnHeader,
        value: CellValue,
    ) -> Result<(), CoreError> {
        if row >= self.num_rows {
            return Err(CoreError::NotFound(format!("row {row}")));
        }
        let column = self.column_mut(header)?;
        let values = Arc::make_mut(&mut column.values);
        values[row] = value;
        column.dtype = ColumnType::infer(values);
        widen_integers(values, column.dtype);
        Ok(())
    }

    /// Convert an integer column to floats, leaving other columns untouched.
    pub fn cast_to_float(&mut self, header: &ColumnHeader) -> Result<(), CoreError> {
        let column = self.column_mut(header)?;
        if column.dtype != ColumnType::Integer {
            return Ok(());
        }
        widen_integers(Arc::<Vec<CellValue>>::make_mut(&mut column.values), ColumnType::Float);
        column.dtype = ColumnType::Float;
        Ok(())
    }

    /// Swap in a whole new set of cells for one column.
    pub fn replace_values(&mut self, header: &ColumnHeader, values: Vec<CellValue>) -> Result<(), CoreError> {
        if values.len() != self.num_rows {
            return Err(CoreError::InvalidData(format!(
                "column {header} needs {} values, got {}",
                self.num_rows,
                values.len()
            )));
        }
        let column = self.column_mut(header)?;
        *column = Column::new(column.header.clone(), values);
        Ok(())
    }

    /// Copy every column's cells into fresh storage.
    pub fn deep_copy(&self) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    header: c.header.clone(),
                    dtype: c.dtype,
                    values: Arc::new(c.values.as_ref().clone()),
                })
                .collect(),
            num_rows: self.num_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            ("A".into(), vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Integer(3)]),
            ("B".into(), vec![CellValue::text("x"), CellValue::text("y"), CellValue::text("z")]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_and_duplicate_columns() {
        let ragged = Table::new(vec![
            ("A".into(), vec![CellValue::Integer(1)]),
            ("B".into(), vec![]),
        ]);
        assert!(matches!(ragged, Err(CoreError::InvalidData(_))));

        let dup = Table::new(vec![("A".into(), vec![]), ("A".into(), vec![])]);
        assert!(matches!(dup, Err(CoreError::DuplicateHeader(_))));
    }

    #[test]
    fn shallow_clone_is_copy_on_write() {
        let original = sample();
        let mut copy = original.clone();
        assert!(copy.columns()[0].shares_storage_with(&original.columns()[0]));

        copy.set_cell(0, &"A".into(), CellValue::Integer(100)).unwrap();
        assert_eq!(original.columns()[0].values()[0], CellValue::Integer(1));
        assert_eq!(copy.columns()[0].values()[0], CellValue::Integer(100));
        assert!(copy.columns()[1].shares_storage_with(&original.columns()[1]));
    }

    #[test]
    fn deep_copy_detaches_storage() {
        let original = sample();
        let copy = original.deep_copy();
        assert_eq!(copy, original);
        assert!(!copy.columns()[0].shares_storage_with(&original.columns()[0]));
    }

    #[test]
    fn move_and_insert_clamp_indexes() {
        let mut table = sample();
        table.insert_column(99, "C".into(), CellValue::Integer(0)).unwrap();
        assert_eq!(table.headers(), vec!["A".into(), "B".into(), "C".into()]);
        table.move_column(&"A".into(), 99).unwrap();
        assert_eq!(table.headers(), vec!["B".into(), "C".into(), "A".into()]);
    }

    #[test]
    fn simultaneous_renames_can_swap() {
        let mut table = sample();
        table
            .rename_columns(&[("A".into(), "B".into()), ("B".into(), "A".into()), ("Q".into(), "R".into())])
            .unwrap();
        assert_eq!(table.headers(), vec!["B".into(), "A".into()]);
        assert!(table.rename_columns(&[("A".into(), "B".into())]).is_err());
    }

    #[test]
    fn retain_rows_filters_every_column() {
        let mut table = sample();
        table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.columns()[1].values(), &[CellValue::text("x"), CellValue::text("z")]);
    }

    #[test]
    fn missing_value_widens_an_integer_column() {
        let table = Table::new(vec![("A".into(), vec![CellValue::Integer(1), CellValue::Null])]).unwrap();
        assert_eq!(table.columns()[0].dtype(), ColumnType::Float);
        assert_eq!(table.columns()[0].values(), &[CellValue::Float(1.0), CellValue::Null]);

        let mut table = sample();
        table.set_cell(1, &"A".into(), CellValue::Null).unwrap();
        assert_eq!(table.columns()[0].dtype(), ColumnType::Float);
        assert_eq!(table.columns()[0].values()[0], CellValue::Float(1.0));
    }

    #[test]
    fn cast_to_float_widens_integers() {
        let mut table = sample();
        table.cast_to_float(&"A".into()).unwrap();
        assert_eq!(table.columns()[0].dtype(), ColumnType::Float);
        assert_eq!(table.columns()[0].values()[2], CellValue::Float(3.0));
    }

    #[test]
    fn replaced_values_are_retyped() {
        let mut table = sample();
        table
            .replace_values(&"A".into(), vec![CellValue::text("p"), CellValue::text("q"), CellValue::Null])
            .unwrap();
        assert_eq!(table.columns()[0].dtype(), ColumnType::Text);
        assert!(matches!(
            table.replace_values(&"A".into(), vec![CellValue::Null]),
            Err(CoreError::InvalidData(_))
        ));
    }
}
