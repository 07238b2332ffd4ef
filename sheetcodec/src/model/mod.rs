//! In-memory workbook model

mod cell_ref;
mod value;
mod workbook;
mod worksheet;

pub use cell_ref::{
    CellRange, CellRef, MAX_COLUMNS, MAX_ROWS, column_index, column_letters, parse_cell_ref,
};
pub use value::{CellType, CellValue, Number};
pub use workbook::{DefinedName, DocProperties, FILTER_DATABASE, Workbook, quote_sheet_name};
pub use worksheet::{
    Cell, ColumnInfo, DEFAULT_ROW_HEIGHT, MAX_SHEET_NAME_LEN, Pane, ProtectionOption, RowInfo,
    SheetProtection, SheetState, Worksheet, legacy_password_hash,
};
