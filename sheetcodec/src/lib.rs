//! sheetcodec: reader and writer for OOXML spreadsheet packages
//!
//! A package is read into an in-memory [`Workbook`], edited through the
//! model types, and written back. Styles are deduplicated into the shared
//! records the format requires; strings go through a shared-string table.

pub mod config;
pub mod date;
pub mod error;
pub mod metadata;
pub mod model;
pub mod reader;
pub mod strings;
pub mod style;
pub mod writer;
pub mod xml;

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

pub use config::{CodecConfig, Enforcement, ExportOptions, ImportOptions, TargetType};
pub use error::{PackageError, XlsxError};
pub use model::{
    Cell, CellRange, CellRef, CellType, CellValue, DefinedName, DocProperties, Number, Workbook,
    Worksheet,
};
pub use style::{Style, ValidationMode};

/// Read a package from disk with default import options
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook, PackageError> {
    read_workbook_with(path, &ImportOptions::default())
}

/// Read a package from disk, post-processing cells with `options`
pub fn read_workbook_with<P: AsRef<Path>>(
    path: P,
    options: &ImportOptions,
) -> Result<Workbook, PackageError> {
    let file = File::open(path.as_ref()).map_err(|e| PackageError::Load(e.into()))?;
    read_workbook_from_reader(BufReader::new(file), options)
}

pub fn read_workbook_from_reader<R: Read + Seek>(
    reader: R,
    options: &ImportOptions,
) -> Result<Workbook, PackageError> {
    reader::read_package(reader, options).map_err(PackageError::Load)
}

/// Write a package to disk with default export options
pub fn write_workbook<P: AsRef<Path>>(workbook: &Workbook, path: P) -> Result<(), PackageError> {
    write_workbook_with(workbook, path, &ExportOptions::default())
}

/// Write a package to disk; the file is created only after the package
/// has been generated in memory
pub fn write_workbook_with<P: AsRef<Path>>(
    workbook: &Workbook,
    path: P,
    options: &ExportOptions,
) -> Result<(), PackageError> {
    let bytes = write_workbook_to_vec(workbook, options)?;
    fs::write(path.as_ref(), bytes).map_err(|e| PackageError::Save(e.into()))
}

/// Write a package into memory
pub fn write_workbook_to_vec(
    workbook: &Workbook,
    options: &ExportOptions,
) -> Result<Vec<u8>, PackageError> {
    writer::write_package(workbook, options, Cursor::new(Vec::new()))
        .map(Cursor::into_inner)
        .map_err(PackageError::Save)
}
