use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::column_ids::ColumnIdMap;
use crate::error::CoreError;
use crate::filter::FilterSpec;
use crate::format::FormatType;
use crate::header::ColumnHeader;
use crate::ids::ColumnId;
use crate::names::first_unused_name;
use crate::table::Table;
use crate::value::CellValue;

/// Where a table in the state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Passed,
    Imported,
    Pivoted,
    Merged,
    Duplicated,
}

/// The per-column metadata maps held by a [`State`].
///
/// Anything that must touch every map (seeding, dropping, rekeying during id
/// migration, invariant checks) walks [`ColumnField::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnField {
    Formulas,
    Filters,
    Formats,
}

impl ColumnField {
    pub const ALL: [ColumnField; 3] = [ColumnField::Formulas, ColumnField::Filters, ColumnField::Formats];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnField::Formulas => "column_formulas",
            ColumnField::Filters => "column_filters",
            ColumnField::Formats => "column_formats",
        }
    }
}

/// Options for [`State::add_table`].
#[derive(Debug, Clone, Default)]
pub struct AddTable {
    sheet_index: Option<usize>,
    name: Option<String>,
    format_overrides: HashMap<ColumnHeader, FormatType>,
}

impl AddTable {
    pub fn append() -> Self {
        Self::default()
    }

    /// Replace the table at `sheet_index` instead of appending.
    pub fn replacing(sheet_index: usize) -> Self {
        Self {
            sheet_index: Some(sheet_index),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_format(mut self, header: ColumnHeader, format: FormatType) -> Self {
        self.format_overrides.insert(header, format);
        self
    }
}

/// One snapshot of every table in an analysis plus its per-column metadata.
///
/// `Clone` is the shallow copy: cell storage is shared copy-on-write, every
/// map is freshly allocated. [`State::deep_copy`] also copies cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    tables: Vec<Table>,
    names: Vec<String>,
    provenance: Vec<Provenance>,
    column_ids: ColumnIdMap,
    column_formulas: Vec<BTreeMap<ColumnId, String>>,
    column_filters: Vec<BTreeMap<ColumnId, FilterSpec>>,
    column_formats: Vec<BTreeMap<ColumnId, FormatType>>,
}

type SeededMetadata = (
    BTreeMap<ColumnId, String>,
    BTreeMap<ColumnId, FilterSpec>,
    BTreeMap<ColumnId, FormatType>,
);

/// Fresh formulas, filters and formats for a newly added table.
fn seeded_metadata(
    ids: &[ColumnId],
    headers: &[ColumnHeader],
    format_overrides: &HashMap<ColumnHeader, FormatType>,
) -> SeededMetadata {
    let formulas = ids.iter().map(|id| (id.clone(), String::new())).collect();
    let filters = ids.iter().map(|id| (id.clone(), FilterSpec::default())).collect();
    let formats = ids
        .iter()
        .zip(headers)
        .map(|(id, header)| (id.clone(), format_overrides.get(header).cloned().unwrap_or_default()))
        .collect();
    (formulas, filters, formats)
}

fn rekey<V>(map: &mut BTreeMap<ColumnId, V>, remap: &BTreeMap<ColumnId, ColumnId>) {
    let old = std::mem::take(map);
    *map = old
        .into_iter()
        .map(|(id, value)| (remap.get(&id).cloned().unwrap_or(id), value))
        .collect();
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn has_sheet_index(&self, sheet_index: usize) -> bool {
        sheet_index < self.tables.len()
    }

    fn check_sheet(&self, sheet_index: usize) -> Result<(), CoreError> {
        if self.has_sheet_index(sheet_index) {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("sheet {sheet_index}")))
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, sheet_index: usize) -> Result<&Table, CoreError> {
        self.tables
            .get(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, sheet_index: usize) -> Result<&str, CoreError> {
        self.names
            .get(sheet_index)
            .map(String::as_str)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    pub fn provenance(&self, sheet_index: usize) -> Result<Provenance, CoreError> {
        self.provenance
            .get(sheet_index)
            .copied()
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    pub fn column_ids(&self) -> &ColumnIdMap {
        &self.column_ids
    }

    /// Where synthetic id minting currently stands.
    pub fn id_counter(&self) -> u64 {
        self.column_ids.next_counter()
    }

    /// Make sure every id minted from here on comes from `counter` or later.
    pub fn reserve_column_ids(&mut self, counter: u64) {
        self.column_ids.reserve_through(counter);
    }

    pub fn header(&self, sheet_index: usize, column_id: &ColumnId) -> Result<&ColumnHeader, CoreError> {
        self.column_ids.get_header(sheet_index, column_id)
    }

    pub fn column_formulas(&self, sheet_index: usize) -> Result<&BTreeMap<ColumnId, String>, CoreError> {
        self.column_formulas
            .get(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    pub fn column_filters(&self, sheet_index: usize) -> Result<&BTreeMap<ColumnId, FilterSpec>, CoreError> {
        self.column_filters
            .get(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    pub fn column_formats(&self, sheet_index: usize) -> Result<&BTreeMap<ColumnId, FormatType>, CoreError> {
        self.column_formats
            .get(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    /// Copy cell storage as well as metadata.
    pub fn deep_copy(&self) -> Self {
        Self {
            tables: self.tables.iter().map(Table::deep_copy).collect(),
            ..self.clone()
        }
    }

    /// Add a table, appending by default or replacing the sheet named in `options`.
    ///
    /// Appending names the table `df{n}` unless a name is given, and seeds
    /// every column with an empty formula, an unrestricted filter and the
    /// default format. Replacing keeps the old name and provenance unless new
    /// ones are supplied and resets the metadata of every column. An appended
    /// table must say where it came from.
    pub fn add_table(
        &mut self,
        table: Table,
        provenance: impl Into<Option<Provenance>>,
        options: AddTable,
    ) -> Result<usize, CoreError> {
        let headers = table.headers();
        match (options.sheet_index, provenance.into()) {
            (None, None) => Err(CoreError::InvalidData("an appended table needs a provenance".into())),
            (None, Some(provenance)) => {
                let ids = self.column_ids.add_table(&headers, None)?;
                let (formulas, filters, formats) = seeded_metadata(&ids, &headers, &options.format_overrides);
                let name = match options.name {
                    Some(name) => name,
                    None => first_unused_name(&self.names, &format!("df{}", self.tables.len() + 1)),
                };
                self.tables.push(table);
                self.names.push(name);
                self.provenance.push(provenance);
                self.column_formulas.push(formulas);
                self.column_filters.push(filters);
                self.column_formats.push(formats);
                Ok(self.tables.len() - 1)
            }
            (Some(index), provenance) => {
                self.check_sheet(index)?;
                let ids = self.column_ids.add_table(&headers, Some(index))?;
                let (formulas, filters, formats) = seeded_metadata(&ids, &headers, &options.format_overrides);
                self.tables[index] = table;
                if let Some(name) = options.name {
                    self.names[index] = name;
                }
                if let Some(provenance) = provenance {
                    self.provenance[index] = provenance;
                }
                self.column_formulas[index] = formulas;
                self.column_filters[index] = filters;
                self.column_formats[index] = formats;
                Ok(index)
            }
        }
    }

    /// Append a copy of a sheet that shares its column ids and metadata.
    pub fn duplicate_table(&mut self, sheet_index: usize, name: String) -> Result<usize, CoreError> {
        let table = self.table(sheet_index)?.clone();
        let ids = self.column_ids.get_column_ids(sheet_index)?;
        self.column_ids.add_table_with_ids(&table.headers(), &ids)?;
        self.tables.push(table);
        self.names.push(name);
        self.provenance.push(Provenance::Duplicated);
        self.column_formulas.push(self.column_formulas[sheet_index].clone());
        self.column_filters.push(self.column_filters[sheet_index].clone());
        self.column_formats.push(self.column_formats[sheet_index].clone());
        Ok(self.tables.len() - 1)
    }

    /// Remove a sheet; later sheets shift down by one.
    pub fn remove_table(&mut self, sheet_index: usize) -> Result<(), CoreError> {
        self.check_sheet(sheet_index)?;
        self.column_ids.remove_table(sheet_index)?;
        self.tables.remove(sheet_index);
        self.names.remove(sheet_index);
        self.provenance.remove(sheet_index);
        for field in ColumnField::ALL {
            match field {
                ColumnField::Formulas => {
                    self.column_formulas.remove(sheet_index);
                }
                ColumnField::Filters => {
                    self.column_filters.remove(sheet_index);
                }
                ColumnField::Formats => {
                    self.column_formats.remove(sheet_index);
                }
            }
        }
        Ok(())
    }

    pub fn rename_table(&mut self, sheet_index: usize, name: String) -> Result<(), CoreError> {
        self.check_sheet(sheet_index)?;
        self.names[sheet_index] = name;
        Ok(())
    }

    pub fn rename_column(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        new_header: ColumnHeader,
    ) -> Result<(), CoreError> {
        let old_header = self.header(sheet_index, column_id)?.clone();
        if old_header == new_header {
            return Ok(());
        }
        self.tables[sheet_index].rename_column(&old_header, new_header.clone())?;
        self.column_ids.set_header(sheet_index, column_id, new_header)
    }

    pub fn delete_column(&mut self, sheet_index: usize, column_id: &ColumnId) -> Result<(), CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        self.tables[sheet_index].drop_column(&header)?;
        self.column_ids.delete_column(sheet_index, column_id)?;
        for field in ColumnField::ALL {
            self.drop_field_entry(field, sheet_index, column_id);
        }
        Ok(())
    }

    /// Insert a column filled with `fill` and return its new id.
    pub fn insert_column(
        &mut self,
        sheet_index: usize,
        position: usize,
        header: ColumnHeader,
        fill: CellValue,
        formula: String,
    ) -> Result<ColumnId, CoreError> {
        self.check_sheet(sheet_index)?;
        self.tables[sheet_index].insert_column(position, header.clone(), fill)?;
        let column_id = self.column_ids.insert_column(sheet_index, position, header)?;
        for field in ColumnField::ALL {
            self.seed_field_entry(field, sheet_index, &column_id);
        }
        self.column_formulas[sheet_index].insert(column_id.clone(), formula);
        Ok(column_id)
    }

    pub fn reorder_column(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        position: usize,
    ) -> Result<(), CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        self.tables[sheet_index].move_column(&header, position)?;
        self.column_ids.move_column(sheet_index, column_id, position)
    }

    /// Store a column's filter and drop the rows it rejects.
    pub fn apply_filter(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        spec: FilterSpec,
    ) -> Result<usize, CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        let table = &mut self.tables[sheet_index];
        let mask = spec.mask(table.column(&header)?.values());
        let removed = mask.iter().filter(|keep| !**keep).count();
        table.retain_rows(&mask)?;
        self.column_filters[sheet_index].insert(column_id.clone(), spec);
        Ok(removed)
    }

    pub fn set_format(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        format: FormatType,
    ) -> Result<(), CoreError> {
        self.header(sheet_index, column_id)?;
        self.column_formats[sheet_index].insert(column_id.clone(), format);
        Ok(())
    }

    pub fn set_formula(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        formula: String,
    ) -> Result<(), CoreError> {
        self.header(sheet_index, column_id)?;
        self.column_formulas[sheet_index].insert(column_id.clone(), formula);
        Ok(())
    }

    pub fn set_cell(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        row: usize,
        value: CellValue,
    ) -> Result<(), CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        self.tables[sheet_index].set_cell(row, &header, value)
    }

    pub fn set_column_values(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        values: Vec<CellValue>,
    ) -> Result<(), CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        self.tables[sheet_index].replace_values(&header, values)
    }

    pub fn cast_column_to_float(&mut self, sheet_index: usize, column_id: &ColumnId) -> Result<(), CoreError> {
        let header = self.header(sheet_index, column_id)?.clone();
        self.tables[sheet_index].cast_to_float(&header)
    }

    /// Rewrite every column id with the legacy algorithm and rekey all metadata.
    pub fn migrate_to_legacy_scheme(&mut self) -> Result<(), CoreError> {
        let remaps = self.column_ids.migrate_to_legacy_scheme()?;
        for (sheet_index, remap) in remaps.iter().enumerate() {
            for field in ColumnField::ALL {
                match field {
                    ColumnField::Formulas => rekey(&mut self.column_formulas[sheet_index], remap),
                    ColumnField::Filters => rekey(&mut self.column_filters[sheet_index], remap),
                    ColumnField::Formats => rekey(&mut self.column_formats[sheet_index], remap),
                }
            }
        }
        Ok(())
    }

    fn seed_field_entry(&mut self, field: ColumnField, sheet_index: usize, column_id: &ColumnId) {
        let id = column_id.clone();
        match field {
            ColumnField::Formulas => {
                self.column_formulas[sheet_index].insert(id, String::new());
            }
            ColumnField::Filters => {
                self.column_filters[sheet_index].insert(id, FilterSpec::default());
            }
            ColumnField::Formats => {
                self.column_formats[sheet_index].insert(id, FormatType::default());
            }
        }
    }

    fn drop_field_entry(&mut self, field: ColumnField, sheet_index: usize, column_id: &ColumnId) {
        match field {
            ColumnField::Formulas => {
                self.column_formulas[sheet_index].remove(column_id);
            }
            ColumnField::Filters => {
                self.column_filters[sheet_index].remove(column_id);
            }
            ColumnField::Formats => {
                self.column_formats[sheet_index].remove(column_id);
            }
        }
    }

    fn field_len(&self, field: ColumnField) -> usize {
        match field {
            ColumnField::Formulas => self.column_formulas.len(),
            ColumnField::Filters => self.column_filters.len(),
            ColumnField::Formats => self.column_formats.len(),
        }
    }

    fn field_keys(&self, field: ColumnField, sheet_index: usize) -> BTreeSet<&ColumnId> {
        match field {
            ColumnField::Formulas => self.column_formulas[sheet_index].keys().collect(),
            ColumnField::Filters => self.column_filters[sheet_index].keys().collect(),
            ColumnField::Formats => self.column_formats[sheet_index].keys().collect(),
        }
    }

    /// Check the structural invariants that every snapshot must hold.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let len = self.tables.len();
        if self.names.len() != len || self.provenance.len() != len || self.column_ids.num_sheets() != len {
            return Err(CoreError::InvariantViolation(format!(
                "{len} tables but {} names, {} provenance tags and {} id sheets",
                self.names.len(),
                self.provenance.len(),
                self.column_ids.num_sheets()
            )));
        }
        for field in ColumnField::ALL {
            if self.field_len(field) != len {
                return Err(CoreError::InvariantViolation(format!(
                    "{} has {} sheets, expected {len}",
                    field.name(),
                    self.field_len(field)
                )));
            }
        }

        for (sheet_index, table) in self.tables.iter().enumerate() {
            let ids = self.column_ids.get_column_ids(sheet_index)?;
            let mapped = self.column_ids.get_headers(sheet_index, &ids)?;
            if mapped != table.headers() {
                return Err(CoreError::InvariantViolation(format!(
                    "sheet {sheet_index} headers do not match the column id map"
                )));
            }
            let live: BTreeSet<&ColumnId> = ids.iter().collect();
            for field in ColumnField::ALL {
                if self.field_keys(field, sheet_index) != live {
                    return Err(CoreError::InvariantViolation(format!(
                        "{} for sheet {sheet_index} is not keyed by the live column ids",
                        field.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterCondition, FilterOperator};

    fn table(headers: &[&str]) -> Table {
        Table::new(
            headers
                .iter()
                .map(|h| (ColumnHeader::text(*h), vec![CellValue::Integer(1), CellValue::Integer(2)]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn appending_names_and_seeds_metadata() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Passed, AddTable::append()).unwrap();
        state.add_table(table(&["B"]), Provenance::Passed, AddTable::append()).unwrap();
        let index = state
            .add_table(table(&["X", "Y"]), Provenance::Passed, AddTable::append())
            .unwrap();

        assert_eq!(index, 2);
        assert_eq!(state.name(2).unwrap(), "df3");
        assert_eq!(state.provenance(2).unwrap(), Provenance::Passed);
        for id in state.column_ids().get_column_ids(2).unwrap() {
            assert_eq!(state.column_formulas(2).unwrap()[&id], "");
            assert!(state.column_filters(2).unwrap()[&id].is_unrestricted());
            assert_eq!(state.column_formats(2).unwrap()[&id], FormatType::Default);
        }
        state.check_invariants().unwrap();
    }

    #[test]
    fn replacing_keeps_name_unless_given() {
        let mut state = State::new();
        state
            .add_table(table(&["A", "B"]), Provenance::Imported, AddTable::append().named("sales"))
            .unwrap();
        let a = state.column_ids().get_column_id(0, &"A".into()).unwrap().clone();
        state.set_formula(0, &a, "=1".into()).unwrap();

        state
            .add_table(
                table(&["A", "C"]),
                Provenance::Pivoted,
                AddTable::replacing(0).with_format("C".into(), FormatType::Percentage),
            )
            .unwrap();

        assert_eq!(state.name(0).unwrap(), "sales");
        assert_eq!(state.provenance(0).unwrap(), Provenance::Pivoted);
        assert_eq!(state.column_ids().get_column_id(0, &"A".into()).unwrap(), &a);
        assert_eq!(state.column_formulas(0).unwrap()[&a], "");
        let c = state.column_ids().get_column_id(0, &"C".into()).unwrap();
        assert_eq!(state.column_formats(0).unwrap()[c], FormatType::Percentage);
        state.check_invariants().unwrap();
    }

    #[test]
    fn replacing_without_provenance_keeps_the_old_tag() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Pivoted, AddTable::append()).unwrap();
        state.add_table(table(&["A", "B"]), None, AddTable::replacing(0)).unwrap();
        assert_eq!(state.provenance(0).unwrap(), Provenance::Pivoted);
        assert_eq!(state.table(0).unwrap().num_columns(), 2);

        assert!(matches!(
            state.add_table(table(&["Z"]), None, AddTable::append()),
            Err(CoreError::InvalidData(_))
        ));
        assert!(state.add_table(table(&["Z"]), None, AddTable::replacing(3)).is_err());
        assert_eq!(state.num_tables(), 1);
        state.check_invariants().unwrap();
    }

    #[test]
    fn shallow_copy_never_aliases_metadata() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Passed, AddTable::append()).unwrap();
        let id = ColumnId::from("c1");

        let mut copy = state.clone();
        copy.set_format(0, &id, FormatType::Currency).unwrap();
        copy.rename_column(0, &id, "Z".into()).unwrap();
        copy.set_cell(0, &id, 0, CellValue::Integer(9)).unwrap();

        assert_eq!(state.column_formats(0).unwrap()[&id], FormatType::Default);
        assert_eq!(state.header(0, &id).unwrap(), &ColumnHeader::text("A"));
        assert_eq!(state.table(0).unwrap().columns()[0].values()[0], CellValue::Integer(1));
    }

    #[test]
    fn column_edits_keep_invariants() {
        let mut state = State::new();
        state.add_table(table(&["A", "B"]), Provenance::Passed, AddTable::append()).unwrap();
        let a = ColumnId::from("c1");
        let b = ColumnId::from("c2");

        let c = state
            .insert_column(0, 1, "C".into(), CellValue::Integer(0), "=0".into())
            .unwrap();
        assert_eq!(c, ColumnId::from("c3"));
        assert_eq!(state.column_formulas(0).unwrap()[&c], "=0");
        state.reorder_column(0, &a, 5).unwrap();
        assert_eq!(state.column_ids().get_column_ids(0).unwrap(), vec![c.clone(), b.clone(), a.clone()]);
        state.delete_column(0, &b).unwrap();
        assert!(!state.column_filters(0).unwrap().contains_key(&b));
        state.check_invariants().unwrap();
    }

    #[test]
    fn filter_drops_rows_and_records_spec() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Passed, AddTable::append()).unwrap();
        let id = ColumnId::from("c1");
        let spec = FilterSpec::new(FilterOperator::And, vec![FilterCondition::Greater(1.0)]);
        let removed = state.apply_filter(0, &id, spec.clone()).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(state.table(0).unwrap().num_rows(), 1);
        assert_eq!(state.column_filters(0).unwrap()[&id], spec);
    }

    #[test]
    fn duplicate_shares_ids_and_copies_metadata() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Passed, AddTable::append()).unwrap();
        let id = ColumnId::from("c1");
        state.set_format(0, &id, FormatType::Accounting).unwrap();
        let index = state.duplicate_table(0, "df1_copy".into()).unwrap();

        assert_eq!(state.provenance(index).unwrap(), Provenance::Duplicated);
        assert_eq!(state.column_formats(index).unwrap()[&id], FormatType::Accounting);
        state.set_format(index, &id, FormatType::Currency).unwrap();
        assert_eq!(state.column_formats(0).unwrap()[&id], FormatType::Accounting);
        state.check_invariants().unwrap();

        state.remove_table(0).unwrap();
        assert_eq!(state.name(0).unwrap(), "df1_copy");
        state.check_invariants().unwrap();
    }

    #[test]
    fn legacy_migration_rekeys_every_field() {
        let mut state = State::new();
        state
            .add_table(table(&["first name", "2020"]), Provenance::Passed, AddTable::append())
            .unwrap();
        state.set_formula(0, &ColumnId::from("c1"), "=A".into()).unwrap();
        state.migrate_to_legacy_scheme().unwrap();

        let legacy = ColumnId::from("first_name");
        assert_eq!(state.column_formulas(0).unwrap()[&legacy], "=A");
        assert!(state.column_formats(0).unwrap().contains_key(&ColumnId::from("c2020")));
        state.check_invariants().unwrap();
        assert!(state.migrate_to_legacy_scheme().is_err());
    }

    #[test]
    fn invariant_check_catches_desync() {
        let mut state = State::new();
        state.add_table(table(&["A"]), Provenance::Passed, AddTable::append()).unwrap();
        state.column_formats[0].clear();
        assert!(matches!(state.check_invariants(), Err(CoreError::InvariantViolation(_))));
    }
}
