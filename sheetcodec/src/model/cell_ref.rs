//! A1-style cell addresses and ranges

use std::fmt;
use std::str::FromStr;

use crate::error::XlsxError;

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLUMNS: u32 = 16_384;

/// Column letters for a 0-based column index
pub fn column_letters(col: u32) -> String {
    let mut c = col + 1;
    let mut letters = Vec::new();
    while c > 0 {
        let m = (c - 1) % 26;
        letters.push(b'A' + m as u8);
        c = (c - m - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// 0-based column index for column letters such as `"AB"`
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLUMNS {
            return None;
        }
    }
    (col <= MAX_COLUMNS).then(|| col - 1)
}

/// Parse a cell reference like "A1" or "$B$7" into (row, col) as 0-based indices
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let s = cell_ref.trim().trim_start_matches('$');
    let split = s.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = s.split_at(split);
    let digits = digits.strip_prefix('$').unwrap_or(digits);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row = digits.parse::<u32>().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }
    Some((row - 1, column_index(letters)?))
}

/// Address of one cell, 0-based. Orders row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// `$A$1` form used in defined names
    pub fn to_absolute(&self) -> String {
        format!("${}${}", column_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = XlsxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cell_ref(s)
            .map(|(row, col)| CellRef { row, col })
            .ok_or_else(|| XlsxError::Validation(format!("invalid cell reference '{s}'")))
    }
}

impl From<(u32, u32)> for CellRef {
    fn from((row, col): (u32, u32)) -> Self {
        CellRef { row, col }
    }
}

/// Rectangular block of cells, corners inclusive and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(cell: CellRef) -> Self {
        Self {
            start: cell,
            end: cell,
        }
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Every address in the range, row-major
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + use<> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellRef::new(row, col)))
    }

    /// `$A$1:$B$2` form used in defined names
    pub fn to_absolute(&self) -> String {
        format!("{}:{}", self.start.to_absolute(), self.end.to_absolute())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = XlsxError;

    /// Accepts `A1:B2`, `$A$1:$B$2` and a lone `A1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(CellRange::new(a.parse()?, b.parse()?)),
            None => Ok(CellRange::single(s.parse()?)),
        }
    }
}
