use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::CoreError;
use crate::header::ColumnHeader;
use crate::ids::ColumnId;
use crate::names::{first_unused_name, legacy_column_id};

/// How fresh column ids are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// Independent tokens from a monotonic counter.
    #[default]
    Synthetic,
    /// Sanitized header text, kept for analyses that predate synthetic ids.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SheetIds {
    /// In table column order.
    entries: Vec<(ColumnId, ColumnHeader)>,
}

impl SheetIds {
    fn id_of(&self, header: &ColumnHeader) -> Option<&ColumnId> {
        self.entries.iter().find(|(_, h)| h == header).map(|(id, _)| id)
    }

    fn position_of(&self, column_id: &ColumnId) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == column_id)
    }

    fn taken(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.as_str().to_string()).collect()
    }
}

/// Maps every column of every sheet to a stable [`ColumnId`].
///
/// Per-column metadata in [`crate::State`] is keyed by these ids, never by
/// header, so renames and reorders only touch this map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIdMap {
    sheets: Vec<SheetIds>,
    next_id: u64,
    scheme: IdScheme,
}

impl Default for ColumnIdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnIdMap {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            next_id: 1,
            scheme: IdScheme::Synthetic,
        }
    }

    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    pub fn num_sheets(&self) -> usize {
        self.sheets.len()
    }

    /// The counter the next synthetic id is minted from.
    pub fn next_counter(&self) -> u64 {
        self.next_id
    }

    /// Move the counter forward so no id below `counter` is minted again.
    /// Never moves it back.
    pub fn reserve_through(&mut self, counter: u64) {
        self.next_id = self.next_id.max(counter);
    }

    fn sheet(&self, sheet_index: usize) -> Result<&SheetIds, CoreError> {
        self.sheets
            .get(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    fn sheet_mut(&mut self, sheet_index: usize) -> Result<&mut SheetIds, CoreError> {
        self.sheets
            .get_mut(sheet_index)
            .ok_or_else(|| CoreError::NotFound(format!("sheet {sheet_index}")))
    }

    fn mint(next_id: &mut u64, scheme: IdScheme, taken: &[String], header: &ColumnHeader) -> ColumnId {
        match scheme {
            IdScheme::Synthetic => {
                let id = ColumnId::synthetic(*next_id);
                *next_id += 1;
                id
            }
            IdScheme::Legacy => {
                ColumnId::from_raw(first_unused_name(taken, &legacy_column_id(&header.flatten())))
            }
        }
    }

    /// Assign ids to a table's headers.
    ///
    /// With no `sheet_index` the table is appended. Replacing an existing sheet
    /// keeps the ids of headers that were already there and mints ids for the
    /// rest; headers that disappeared lose their ids.
    pub fn add_table(
        &mut self,
        headers: &[ColumnHeader],
        sheet_index: Option<usize>,
    ) -> Result<Vec<ColumnId>, CoreError> {
        let previous = match sheet_index {
            None => SheetIds::default(),
            Some(index) => self.sheet(index)?.clone(),
        };

        let mut sheet = SheetIds::default();
        let mut taken = previous.taken();
        for header in headers {
            if sheet.id_of(header).is_some() {
                return Err(CoreError::DuplicateHeader(header.to_string()));
            }
            let id = match previous.id_of(header) {
                Some(id) => id.clone(),
                None => {
                    let id = Self::mint(&mut self.next_id, self.scheme, &taken, header);
                    taken.push(id.as_str().to_string());
                    id
                }
            };
            sheet.entries.push((id, header.clone()));
        }

        let ids = sheet.entries.iter().map(|(id, _)| id.clone()).collect();
        match sheet_index {
            None => self.sheets.push(sheet),
            Some(index) => self.sheets[index] = sheet,
        }
        Ok(ids)
    }

    /// Append a sheet whose columns reuse existing ids, as a duplicated table does.
    pub fn add_table_with_ids(
        &mut self,
        headers: &[ColumnHeader],
        ids: &[ColumnId],
    ) -> Result<(), CoreError> {
        if headers.len() != ids.len() {
            return Err(CoreError::InvalidData(format!(
                "{} headers but {} column ids",
                headers.len(),
                ids.len()
            )));
        }
        let unique: HashSet<&ColumnId> = ids.iter().collect();
        if unique.len() != ids.len() {
            return Err(CoreError::InvalidData("column ids are not unique".into()));
        }
        let entries = ids.iter().cloned().zip(headers.iter().cloned()).collect();
        self.sheets.push(SheetIds { entries });
        Ok(())
    }

    pub fn remove_table(&mut self, sheet_index: usize) -> Result<(), CoreError> {
        self.sheet(sheet_index)?;
        self.sheets.remove(sheet_index);
        Ok(())
    }

    pub fn get_column_ids(&self, sheet_index: usize) -> Result<Vec<ColumnId>, CoreError> {
        Ok(self
            .sheet(sheet_index)?
            .entries
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    pub fn contains(&self, sheet_index: usize, column_id: &ColumnId) -> bool {
        self.sheets
            .get(sheet_index)
            .is_some_and(|sheet| sheet.position_of(column_id).is_some())
    }

    pub fn get_header(&self, sheet_index: usize, column_id: &ColumnId) -> Result<&ColumnHeader, CoreError> {
        self.sheet(sheet_index)?
            .entries
            .iter()
            .find(|(id, _)| id == column_id)
            .map(|(_, header)| header)
            .ok_or_else(|| CoreError::NotFound(format!("column id {column_id} in sheet {sheet_index}")))
    }

    pub fn get_headers(
        &self,
        sheet_index: usize,
        column_ids: &[ColumnId],
    ) -> Result<Vec<ColumnHeader>, CoreError> {
        column_ids
            .iter()
            .map(|id| self.get_header(sheet_index, id).cloned())
            .collect()
    }

    pub fn get_column_id(&self, sheet_index: usize, header: &ColumnHeader) -> Result<&ColumnId, CoreError> {
        self.sheet(sheet_index)?
            .id_of(header)
            .ok_or_else(|| CoreError::NotFound(format!("column header {header} in sheet {sheet_index}")))
    }

    /// Ids to current headers, as sent to the frontend.
    pub fn headers_by_id(&self, sheet_index: usize) -> Result<BTreeMap<ColumnId, ColumnHeader>, CoreError> {
        Ok(self.sheet(sheet_index)?.entries.iter().cloned().collect())
    }

    pub fn set_header(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        header: ColumnHeader,
    ) -> Result<(), CoreError> {
        let sheet = self.sheet_mut(sheet_index)?;
        if let Some(existing) = sheet.id_of(&header)
            && existing != column_id
        {
            return Err(CoreError::DuplicateHeader(header.to_string()));
        }
        let position = sheet
            .position_of(column_id)
            .ok_or_else(|| CoreError::NotFound(format!("column id {column_id} in sheet {sheet_index}")))?;
        sheet.entries[position].1 = header;
        Ok(())
    }

    pub fn insert_column(
        &mut self,
        sheet_index: usize,
        position: usize,
        header: ColumnHeader,
    ) -> Result<ColumnId, CoreError> {
        let scheme = self.scheme;
        let mut next_id = self.next_id;
        let sheet = self.sheet_mut(sheet_index)?;
        if sheet.id_of(&header).is_some() {
            return Err(CoreError::DuplicateHeader(header.to_string()));
        }
        let id = Self::mint(&mut next_id, scheme, &sheet.taken(), &header);
        let position = position.min(sheet.entries.len());
        sheet.entries.insert(position, (id.clone(), header));
        self.next_id = next_id;
        Ok(id)
    }

    pub fn delete_column(&mut self, sheet_index: usize, column_id: &ColumnId) -> Result<(), CoreError> {
        let sheet = self.sheet_mut(sheet_index)?;
        let position = sheet
            .position_of(column_id)
            .ok_or_else(|| CoreError::NotFound(format!("column id {column_id} in sheet {sheet_index}")))?;
        sheet.entries.remove(position);
        Ok(())
    }

    pub fn move_column(
        &mut self,
        sheet_index: usize,
        column_id: &ColumnId,
        position: usize,
    ) -> Result<(), CoreError> {
        let sheet = self.sheet_mut(sheet_index)?;
        let from = sheet
            .position_of(column_id)
            .ok_or_else(|| CoreError::NotFound(format!("column id {column_id} in sheet {sheet_index}")))?;
        let entry = sheet.entries.remove(from);
        let position = position.min(sheet.entries.len());
        sheet.entries.insert(position, entry);
        Ok(())
    }

    /// Rewrite every id with the deprecated sanitize-header algorithm.
    ///
    /// Returns, per sheet, the old id to new id mapping so callers can rekey
    /// anything stored by id. Fails if the map is already on the legacy scheme.
    pub fn migrate_to_legacy_scheme(&mut self) -> Result<Vec<BTreeMap<ColumnId, ColumnId>>, CoreError> {
        if self.scheme == IdScheme::Legacy {
            return Err(CoreError::InvalidData("column ids already use the legacy scheme".into()));
        }
        let mut remaps = Vec::with_capacity(self.sheets.len());
        for sheet in &mut self.sheets {
            let mut taken: Vec<String> = Vec::with_capacity(sheet.entries.len());
            let mut remap = BTreeMap::new();
            for (id, header) in &mut sheet.entries {
                let legacy = first_unused_name(&taken, &legacy_column_id(&header.flatten()));
                taken.push(legacy.clone());
                let legacy = ColumnId::from_raw(legacy);
                remap.insert(id.clone(), legacy.clone());
                *id = legacy;
            }
            remaps.push(remap);
        }
        self.scheme = IdScheme::Legacy;
        Ok(remaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<ColumnHeader> {
        names.iter().map(|n| ColumnHeader::text(*n)).collect()
    }

    #[test]
    fn ids_are_monotonic_across_sheets() {
        let mut map = ColumnIdMap::new();
        let first = map.add_table(&headers(&["A", "B"]), None).unwrap();
        let second = map.add_table(&headers(&["A"]), None).unwrap();
        assert_eq!(first, vec![ColumnId::from("c1"), ColumnId::from("c2")]);
        assert_eq!(second, vec![ColumnId::from("c3")]);
    }

    #[test]
    fn replacing_a_sheet_keeps_ids_of_unchanged_headers() {
        let mut map = ColumnIdMap::new();
        map.add_table(&headers(&["A", "B"]), None).unwrap();
        let ids = map.add_table(&headers(&["B", "C"]), Some(0)).unwrap();
        assert_eq!(ids, vec![ColumnId::from("c2"), ColumnId::from("c3")]);
        assert!(map.get_column_id(0, &"A".into()).is_err());
    }

    #[test]
    fn rename_moves_lookup_not_id() {
        let mut map = ColumnIdMap::new();
        map.add_table(&headers(&["A", "B"]), None).unwrap();
        let id = map.get_column_id(0, &"A".into()).unwrap().clone();
        map.set_header(0, &id, "A2".into()).unwrap();
        assert_eq!(map.get_header(0, &id).unwrap(), &ColumnHeader::text("A2"));
        assert_eq!(map.get_column_id(0, &"A2".into()).unwrap(), &id);
        assert!(matches!(map.get_column_id(0, &"A".into()), Err(CoreError::NotFound(_))));

        let b = map.get_column_id(0, &"B".into()).unwrap().clone();
        assert!(map.set_header(0, &b, "A2".into()).is_err());
    }

    #[test]
    fn deleted_ids_are_never_reissued() {
        let mut map = ColumnIdMap::new();
        map.add_table(&headers(&["A"]), None).unwrap();
        map.delete_column(0, &ColumnId::from("c1")).unwrap();
        let id = map.insert_column(0, 0, "A".into()).unwrap();
        assert_eq!(id, ColumnId::from("c2"));
    }

    #[test]
    fn reserved_counter_only_moves_forward() {
        let mut map = ColumnIdMap::new();
        map.add_table(&headers(&["A"]), None).unwrap();
        map.reserve_through(5);
        assert_eq!(map.insert_column(0, 1, "B".into()).unwrap(), ColumnId::from("c5"));
        map.reserve_through(2);
        assert_eq!(map.next_counter(), 6);
    }

    #[test]
    fn legacy_migration_rewrites_every_sheet_once() {
        let mut map = ColumnIdMap::new();
        map.add_table(&headers(&["First Name", "First-Name"]), None).unwrap();
        let remaps = map.migrate_to_legacy_scheme().unwrap();
        assert_eq!(remaps[0][&ColumnId::from("c1")], ColumnId::from("First_Name"));
        assert_eq!(remaps[0][&ColumnId::from("c2")], ColumnId::from("FirstName"));
        assert_eq!(map.scheme(), IdScheme::Legacy);
        assert!(map.migrate_to_legacy_scheme().is_err());

        let id = map.insert_column(0, 2, "First Name 2".into()).unwrap();
        assert_eq!(id, ColumnId::from("First_Name_2"));
    }

    #[test]
    fn shared_ids_for_duplicates() {
        let mut map = ColumnIdMap::new();
        let ids = map.add_table(&headers(&["A"]), None).unwrap();
        map.add_table_with_ids(&headers(&["A"]), &ids).unwrap();
        assert_eq!(map.get_column_ids(1).unwrap(), ids);
        assert!(map.add_table_with_ids(&headers(&["A", "B"]), &ids).is_err());
    }
}
