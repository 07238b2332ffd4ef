//! Workbook: ordered sheets, defined names and document properties

use chrono::NaiveDateTime;

use super::worksheet::Worksheet;
use crate::error::{Result, XlsxError};
use crate::style::Color;

/// Name of the hidden defined name Excel keeps for each auto-filter
pub const FILTER_DATABASE: &str = "_xlnm._FilterDatabase";

/// A named formula or range from `<definedNames>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Formula text, e.g. `Sheet1!$A$1:$B$4`
    pub refers_to: String,
    /// Position of the sheet the name is scoped to
    pub local_sheet: Option<usize>,
    pub hidden: bool,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refers_to: refers_to.into(),
            local_sheet: None,
            hidden: false,
        }
    }

    pub fn scoped_to(mut self, sheet: usize) -> Self {
        self.local_sheet = Some(sheet);
        self
    }
}

/// Fields of `docProps/core.xml` and `docProps/app.xml`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub category: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    /// Producing application, read from `app.xml`
    pub application: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    /// Position of the sheet shown when the file opens
    pub active_sheet: usize,
    pub defined_names: Vec<DefinedName>,
    pub properties: DocProperties,
    /// Recently used colors kept in the style sheet
    pub mru_colors: Vec<Color>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new empty sheet and return it
    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<&mut Worksheet> {
        let sheet = Worksheet::new(name)?;
        self.push_sheet(sheet)
    }

    /// Append an existing sheet, assigning the next free sheet id if it has none
    pub fn push_sheet(&mut self, mut sheet: Worksheet) -> Result<&mut Worksheet> {
        if self.sheet_index(sheet.name()).is_some() {
            return Err(XlsxError::Validation(format!(
                "a sheet named '{}' already exists",
                sheet.name()
            )));
        }
        if sheet.sheet_id == 0 || self.sheets.iter().any(|s| s.sheet_id == sheet.sheet_id) {
            sheet.sheet_id = self.sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
        }
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Worksheet> {
        let idx = self.sheet_index(name)?;
        let removed = self.sheets.remove(idx);
        self.defined_names.retain(|d| d.local_sheet != Some(idx));
        for defined in &mut self.defined_names {
            if let Some(local) = defined.local_sheet.as_mut()
                && *local > idx
            {
                *local -= 1;
            }
        }
        if self.active_sheet >= self.sheets.len() {
            self.active_sheet = self.sheets.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.sheets.iter_mut()
    }

    /// Get a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.name() == name)
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name() == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn define_name(&mut self, name: DefinedName) -> Result<()> {
        if name.name.is_empty() || name.name.contains(char::is_whitespace) {
            return Err(XlsxError::Validation(format!(
                "invalid defined name '{}'",
                name.name
            )));
        }
        if let Some(local) = name.local_sheet
            && local >= self.sheets.len()
        {
            return Err(XlsxError::Validation(format!(
                "defined name '{}' scoped to missing sheet {local}",
                name.name
            )));
        }
        self.defined_names
            .retain(|d| !(d.name == name.name && d.local_sheet == name.local_sheet));
        self.defined_names.push(name);
        Ok(())
    }

    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.defined_names.iter().find(|d| d.name == name)
    }
}

/// Quote a sheet name for use in a formula reference when needed
pub fn quote_sheet_name(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_ids_are_stable_and_unique() {
        let mut wb = Workbook::new();
        wb.add_sheet("One").unwrap();
        wb.add_sheet("Two").unwrap();
        wb.remove_sheet("One");
        let three = wb.add_sheet("Three").unwrap();
        assert_eq!(three.sheet_id, 3);
        assert_eq!(wb.sheet("Two").unwrap().sheet_id, 2);
        assert!(wb.add_sheet("Two").is_err());
    }

    #[test]
    fn test_remove_sheet_rescopes_names() {
        let mut wb = Workbook::new();
        wb.add_sheet("A").unwrap();
        wb.add_sheet("B").unwrap();
        wb.define_name(DefinedName::new("a_only", "A!$A$1").scoped_to(0)).unwrap();
        wb.define_name(DefinedName::new("b_only", "B!$A$1").scoped_to(1)).unwrap();
        wb.active_sheet = 1;
        wb.remove_sheet("A");
        assert!(wb.defined_name("a_only").is_none());
        assert_eq!(wb.defined_name("b_only").unwrap().local_sheet, Some(0));
        assert_eq!(wb.active_sheet, 0);
    }

    #[test]
    fn test_define_name_validation() {
        let mut wb = Workbook::new();
        wb.add_sheet("A").unwrap();
        assert!(wb.define_name(DefinedName::new("bad name", "A!$A$1")).is_err());
        assert!(wb.define_name(DefinedName::new("x", "A!$A$1").scoped_to(3)).is_err());
        wb.define_name(DefinedName::new("x", "A!$A$1")).unwrap();
        wb.define_name(DefinedName::new("x", "A!$B$1")).unwrap();
        assert_eq!(wb.defined_names.len(), 1);
        assert_eq!(wb.defined_name("x").unwrap().refers_to, "A!$B$1");
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("My Data"), "'My Data'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
    }
}
