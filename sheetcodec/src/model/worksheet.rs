//! Worksheets: cells, row and column settings, merges, panes and protection

use std::collections::BTreeMap;

use super::cell_ref::{CellRange, CellRef};
use super::value::CellValue;
use crate::error::{Result, XlsxError};
use crate::style::Style;

pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<Style>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            style: None,
        }
    }

    pub fn styled(value: impl Into<CellValue>, style: Style) -> Self {
        Self {
            value: value.into(),
            style: Some(style),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowInfo {
    pub height: Option<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnInfo {
    pub width: Option<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }

    pub fn parse(raw: Option<&str>) -> SheetState {
        match raw {
            Some("hidden") => SheetState::Hidden,
            Some("veryHidden") => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }
}

/// Frozen rows above and columns left of the scrolling area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pane {
    pub rows: u32,
    pub cols: u32,
}

impl Pane {
    pub fn top_left_cell(&self) -> CellRef {
        CellRef::new(self.rows, self.cols)
    }
}

/// Actions a protected sheet still allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtectionOption {
    FormatCells,
    FormatColumns,
    FormatRows,
    InsertColumns,
    InsertRows,
    InsertHyperlinks,
    DeleteColumns,
    DeleteRows,
    Sort,
    AutoFilter,
    PivotTables,
}

impl ProtectionOption {
    pub const ALL: [ProtectionOption; 11] = [
        ProtectionOption::FormatCells,
        ProtectionOption::FormatColumns,
        ProtectionOption::FormatRows,
        ProtectionOption::InsertColumns,
        ProtectionOption::InsertRows,
        ProtectionOption::InsertHyperlinks,
        ProtectionOption::DeleteColumns,
        ProtectionOption::DeleteRows,
        ProtectionOption::Sort,
        ProtectionOption::AutoFilter,
        ProtectionOption::PivotTables,
    ];

    /// Attribute of `<sheetProtection>`; "0" there means allowed
    pub fn attribute(&self) -> &'static str {
        match self {
            ProtectionOption::FormatCells => "formatCells",
            ProtectionOption::FormatColumns => "formatColumns",
            ProtectionOption::FormatRows => "formatRows",
            ProtectionOption::InsertColumns => "insertColumns",
            ProtectionOption::InsertRows => "insertRows",
            ProtectionOption::InsertHyperlinks => "insertHyperlinks",
            ProtectionOption::DeleteColumns => "deleteColumns",
            ProtectionOption::DeleteRows => "deleteRows",
            ProtectionOption::Sort => "sort",
            ProtectionOption::AutoFilter => "autoFilter",
            ProtectionOption::PivotTables => "pivotTables",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetProtection {
    /// Legacy 16-bit hash, four upper-case hex digits
    pub password_hash: Option<String>,
    pub allowed: Vec<ProtectionOption>,
}

impl SheetProtection {
    pub fn with_password(password: &str) -> Self {
        Self {
            password_hash: Some(legacy_password_hash(password)),
            allowed: Vec::new(),
        }
    }

    pub fn allow(mut self, option: ProtectionOption) -> Self {
        if !self.allowed.contains(&option) {
            self.allowed.push(option);
            self.allowed.sort();
        }
        self
    }
}

/// The hash stored in the `password` attribute of sheet protection
pub fn legacy_password_hash(password: &str) -> String {
    let bytes: Vec<u16> = password.chars().map(|c| c as u16).collect();
    let rotate = |h: u16| ((h >> 14) & 0x01) | ((h << 1) & 0x7fff);
    let mut hash = 0u16;
    for &ch in bytes.iter().rev() {
        hash = rotate(hash) ^ ch;
    }
    hash = rotate(hash) ^ bytes.len() as u16 ^ 0xCE4B;
    format!("{hash:04X}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    name: String,
    /// Stable id written as `sheetId`
    pub sheet_id: u32,
    pub state: SheetState,
    cells: BTreeMap<CellRef, Cell>,
    rows: BTreeMap<u32, RowInfo>,
    columns: BTreeMap<u32, ColumnInfo>,
    pub default_row_height: f64,
    merged: Vec<CellRange>,
    pub auto_filter: Option<CellRange>,
    pub pane: Option<Pane>,
    pub protection: Option<SheetProtection>,
}

pub(crate) fn validate_sheet_name(name: &str) -> Result<()> {
    const FORBIDDEN: [char; 7] = ['\\', '/', '?', '*', '[', ']', ':'];
    if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(XlsxError::Validation(format!(
            "sheet name '{name}' must be 1..={MAX_SHEET_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(XlsxError::Validation(format!(
            "sheet name '{name}' contains '{bad}'"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(XlsxError::Validation(format!(
            "sheet name '{name}' cannot start or end with an apostrophe"
        )));
    }
    Ok(())
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self::unchecked(name))
    }

    /// Name as read from a package, which may not satisfy the write rules
    pub(crate) fn unchecked(name: String) -> Self {
        Self {
            name,
            sheet_id: 0,
            state: SheetState::Visible,
            cells: BTreeMap::new(),
            rows: BTreeMap::new(),
            columns: BTreeMap::new(),
            default_row_height: DEFAULT_ROW_HEIGHT,
            merged: Vec::new(),
            auto_filter: None,
            pane: None,
            protection: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_sheet_name(&name)?;
        self.name = name;
        Ok(())
    }

    // --- cells ----------------------------------------------------------------

    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cells.get(&at)
    }

    pub fn cell_mut(&mut self, at: CellRef) -> &mut Cell {
        self.cells.entry(at).or_default()
    }

    /// Value at an A1 address; `Empty` for unknown or unparsable addresses
    pub fn value(&self, a1: &str) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        a1.parse::<CellRef>()
            .ok()
            .and_then(|at| self.cells.get(&at))
            .map_or(&EMPTY, |c| &c.value)
    }

    pub fn set_value(&mut self, at: CellRef, value: impl Into<CellValue>) -> &mut Cell {
        let cell = self.cell_mut(at);
        cell.value = value.into();
        cell
    }

    /// Set a value by A1 address
    pub fn set(&mut self, a1: &str, value: impl Into<CellValue>) -> Result<&mut Cell> {
        let at: CellRef = a1.parse()?;
        Ok(self.set_value(at, value))
    }

    pub fn set_style(&mut self, at: CellRef, style: Style) {
        self.cell_mut(at).style = Some(style);
    }

    /// Layer a style fragment onto whatever style the cell already has
    pub fn append_style(&mut self, at: CellRef, fragment: impl Into<crate::style::StyleFragment>) {
        let cell = self.cell_mut(at);
        cell.style.get_or_insert_with(Style::default).append(fragment);
    }

    pub fn remove(&mut self, at: CellRef) -> Option<Cell> {
        self.cells.remove(&at)
    }

    /// Cells in row-then-column order
    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.cells.iter()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = (&CellRef, &mut Cell)> {
        self.cells.iter_mut()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Bounding range of all stored cells
    pub fn dimension(&self) -> Option<CellRange> {
        let first = *self.cells.keys().next()?;
        let last = *self.cells.keys().next_back()?;
        let (min_col, max_col) = self
            .cells
            .keys()
            .fold((u32::MAX, 0), |(lo, hi), c| (lo.min(c.col), hi.max(c.col)));
        Some(CellRange::new(
            CellRef::new(first.row, min_col),
            CellRef::new(last.row, max_col),
        ))
    }

    // --- rows and columns -------------------------------------------------

    pub fn row(&self, row: u32) -> Option<&RowInfo> {
        self.rows.get(&row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&u32, &RowInfo)> {
        self.rows.iter()
    }

    pub fn row_mut(&mut self, row: u32) -> &mut RowInfo {
        self.rows.entry(row).or_default()
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        if !(0.0..=409.0).contains(&height) {
            return Err(XlsxError::Validation(format!(
                "row height {height} outside 0..=409"
            )));
        }
        self.row_mut(row).height = Some(height);
        Ok(())
    }

    pub fn hide_row(&mut self, row: u32) {
        self.row_mut(row).hidden = true;
    }

    pub fn column(&self, col: u32) -> Option<&ColumnInfo> {
        self.columns.get(&col)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&u32, &ColumnInfo)> {
        self.columns.iter()
    }

    pub fn column_mut(&mut self, col: u32) -> &mut ColumnInfo {
        self.columns.entry(col).or_default()
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<()> {
        if !(0.0..=255.0).contains(&width) {
            return Err(XlsxError::Validation(format!(
                "column width {width} outside 0..=255"
            )));
        }
        self.column_mut(col).width = Some(width);
        Ok(())
    }

    pub fn hide_column(&mut self, col: u32) {
        self.column_mut(col).hidden = true;
    }

    // --- ranges and view --------------------------------------------------

    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged
    }

    /// Merge a range; overlapping an existing merge is rejected
    pub fn merge(&mut self, range: CellRange) -> Result<()> {
        if range.is_single() {
            return Err(XlsxError::Validation(format!(
                "cannot merge the single cell {range}"
            )));
        }
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(&range)) {
            return Err(XlsxError::Validation(format!(
                "merge {range} overlaps {existing}"
            )));
        }
        self.merged.push(range);
        Ok(())
    }

    pub fn unmerge(&mut self, range: &CellRange) -> bool {
        let before = self.merged.len();
        self.merged.retain(|m| m != range);
        before != self.merged.len()
    }

    pub fn set_auto_filter(&mut self, range: CellRange) {
        self.auto_filter = Some(range);
    }

    pub fn freeze_panes(&mut self, rows: u32, cols: u32) {
        self.pane = (rows > 0 || cols > 0).then_some(Pane { rows, cols });
    }

    pub fn protect(&mut self, protection: SheetProtection) {
        self.protection = Some(protection);
    }

    /// Prepare merged areas for writing: covered cells lose their values and
    /// take the anchor's style so the merged block renders uniformly.
    pub fn resolve_merged_cells(&mut self) {
        for range in self.merged.clone() {
            let anchor_style = self.cells.get(&range.start).and_then(|c| c.style.clone());
            for at in range.cells().skip(1) {
                match &anchor_style {
                    Some(style) => {
                        let cell = self.cell_mut(at);
                        cell.value = CellValue::Empty;
                        cell.style = Some(style.clone());
                    }
                    None => {
                        self.cells.remove(&at);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Font;

    fn at(a1: &str) -> CellRef {
        a1.parse().unwrap()
    }

    #[test]
    fn test_sheet_name_rules() {
        assert!(Worksheet::new("Data 2024").is_ok());
        assert!(Worksheet::new("").is_err());
        assert!(Worksheet::new("a/b").is_err());
        assert!(Worksheet::new("'quoted'").is_err());
        assert!(Worksheet::new("x".repeat(32)).is_err());
    }

    #[test]
    fn test_values_and_dimension() {
        let mut sheet = Worksheet::new("S").unwrap();
        sheet.set("C2", 1i32).unwrap();
        sheet.set("A5", "x").unwrap();
        sheet.set("B1", true).unwrap();
        assert_eq!(sheet.value("A5"), &CellValue::String("x".into()));
        assert_eq!(sheet.value("Z9"), &CellValue::Empty);
        assert_eq!(sheet.dimension().unwrap().to_string(), "A1:C5");
        let order: Vec<String> = sheet.cells().map(|(r, _)| r.to_string()).collect();
        assert_eq!(order, vec!["B1", "C2", "A5"]);
    }

    #[test]
    fn test_merge_overlap_rejected() {
        let mut sheet = Worksheet::new("S").unwrap();
        sheet.merge("A1:B2".parse().unwrap()).unwrap();
        assert!(sheet.merge("B2:C3".parse().unwrap()).is_err());
        assert!(sheet.merge("D4".parse().unwrap()).is_err());
        assert!(sheet.unmerge(&"A1:B2".parse().unwrap()));
        assert!(sheet.merged_ranges().is_empty());
    }

    #[test]
    fn test_resolve_merged_cells_propagates_anchor_style() {
        let mut sheet = Worksheet::new("S").unwrap();
        let bold = Style::default().appended(Font::bold());
        sheet.set("A1", "title").unwrap();
        sheet.set_style(at("A1"), bold.clone());
        sheet.set("B1", "hidden").unwrap();
        sheet.merge("A1:C1".parse().unwrap()).unwrap();
        sheet.set("E5", "plain").unwrap();
        sheet.merge("E5:E6".parse().unwrap()).unwrap();

        sheet.resolve_merged_cells();

        assert_eq!(sheet.value("A1"), &CellValue::String("title".into()));
        let b1 = sheet.cell(at("B1")).unwrap();
        assert!(b1.value.is_empty());
        assert_eq!(b1.style.as_ref(), Some(&bold));
        assert!(sheet.cell(at("C1")).is_some());
        assert!(sheet.cell(at("E6")).is_none());
    }

    #[test]
    fn test_append_style_layers() {
        let mut sheet = Worksheet::new("S").unwrap();
        sheet.set_style(at("A1"), Style::with_number_format("0.00"));
        sheet.append_style(at("A1"), Font::bold());
        let style = sheet.cell(at("A1")).unwrap().style.as_ref().unwrap();
        assert!(style.font.bold);
        assert_eq!(style.number_format.code, "0.00");
    }

    #[test]
    fn test_password_hash() {
        assert_eq!(legacy_password_hash("password"), "83AF");
        assert_eq!(legacy_password_hash("test"), "CBEB");
        let protection = SheetProtection::with_password("test")
            .allow(ProtectionOption::Sort)
            .allow(ProtectionOption::FormatCells)
            .allow(ProtectionOption::Sort);
        assert_eq!(
            protection.allowed,
            vec![ProtectionOption::FormatCells, ProtectionOption::Sort]
        );
    }

    #[test]
    fn test_freeze_panes() {
        let mut sheet = Worksheet::new("S").unwrap();
        sheet.freeze_panes(1, 0);
        assert_eq!(sheet.pane.unwrap().top_left_cell().to_string(), "A2");
        sheet.freeze_panes(0, 0);
        assert!(sheet.pane.is_none());
    }
}
