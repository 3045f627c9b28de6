//! Report sink abstraction
//!
//! The sheet builders talk to a [`ReportSink`]: they add sheets, request
//! styles and write typed cells. Styles are owned by the sink and handed back
//! as opaque handles; identical specs resolve to the same handle.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Zero-based row index
pub type Row = u32;

/// Zero-based column index
pub type Col = u16;

/// Handle to a sheet created through [`ReportSink::add_sheet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

/// Handle to a style created through [`ReportSink::define_style`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleHandle(pub usize);

/// Errors raised by a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unknown sheet {0:?}")]
    UnknownSheet(SheetId),

    #[error("unknown style {0:?}")]
    UnknownStyle(StyleHandle),

    #[error("sheet '{0}' already exists")]
    DuplicateSheet(String),

    #[error("invalid cell value at row {row}, column {col}: {reason}")]
    InvalidCell { row: Row, col: Col, reason: String },

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
    /// Spreadsheet formula without the leading `=`
    Formula(String),
    Blank,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Reject values a spreadsheet cannot hold
    pub fn validate(&self, row: Row, col: Col) -> Result<(), SinkError> {
        match self {
            Self::Number(n) if !n.is_finite() => Err(SinkError::InvalidCell {
                row,
                col,
                reason: format!("non-finite number {n}"),
            }),
            _ => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Formatting request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StyleSpec {
    pub bold: bool,
    pub font_size: Option<u8>,
    pub num_format: Option<String>,
    /// Solid fill colour as 0xRRGGBB
    pub fill_rgb: Option<u32>,
}

impl StyleSpec {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Default::default()
        }
    }

    pub fn with_font_size(mut self, size: u8) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_num_format(mut self, format: impl Into<String>) -> Self {
        self.num_format = Some(format.into());
        self
    }

    pub fn with_fill(mut self, rgb: u32) -> Self {
        self.fill_rgb = Some(rgb);
        self
    }
}

/// A single cell on a named sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub sheet: String,
    pub row: Row,
    pub col: Col,
}

/// A vertical range within one column of a named sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRange {
    pub sheet: String,
    pub col: Col,
    pub first_row: Row,
    pub last_row: Row,
}

/// One chart series: its name cell and its value range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeriesSpec {
    pub name: CellRef,
    pub values: ColumnRange,
}

/// Stacked bar chart whose data lives on another sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub title: String,
    pub categories: ColumnRange,
    pub series: Vec<ChartSeriesSpec>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Destination for report sheets
pub trait ReportSink {
    /// Append a sheet; names must be unique
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError>;

    /// Obtain a handle for a style, creating it on first use
    fn define_style(&mut self, spec: &StyleSpec) -> Result<StyleHandle, SinkError>;

    fn write_cell(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        cell: &Cell,
        style: Option<StyleHandle>,
    ) -> Result<(), SinkError>;

    fn set_column_width(&mut self, sheet: SheetId, col: Col, width: f64)
        -> Result<(), SinkError>;

    /// Attach an autofilter to a header row spanning `first_col..=last_col`
    fn set_autofilter(
        &mut self,
        sheet: SheetId,
        row: Row,
        first_col: Col,
        last_col: Col,
    ) -> Result<(), SinkError>;

    /// Keep the first `rows` rows visible while scrolling
    fn freeze_rows(&mut self, sheet: SheetId, rows: Row) -> Result<(), SinkError>;

    /// Place a chart with its top-left corner at `row`/`col`
    fn insert_chart(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        chart: &ChartSpec,
    ) -> Result<(), SinkError>;
}

/// Everything written to one sheet of a [`MemorySink`]
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    pub name: String,
    pub cells: BTreeMap<(Row, Col), (Cell, Option<StyleHandle>)>,
    pub column_widths: BTreeMap<Col, f64>,
    pub autofilter: Option<(Row, Col, Col)>,
    pub frozen_rows: Option<Row>,
    pub charts: Vec<(Row, Col, ChartSpec)>,
}

impl MemorySheet {
    pub fn cell(&self, row: Row, col: Col) -> Option<&Cell> {
        self.cells.get(&(row, col)).map(|(c, _)| c)
    }

    /// Text content of a cell, if it holds text
    pub fn text(&self, row: Row, col: Col) -> Option<&str> {
        match self.cell(row, col) {
            Some(Cell::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn style_at(&self, row: Row, col: Col) -> Option<StyleHandle> {
        self.cells.get(&(row, col)).and_then(|(_, s)| *s)
    }

    /// Highest row index holding a cell
    pub fn last_row(&self) -> Option<Row> {
        self.cells.keys().map(|(r, _)| *r).max()
    }

    /// Cells of one row in column order
    pub fn row(&self, row: Row) -> Vec<&Cell> {
        self.cells
            .range((row, 0)..=(row, Col::MAX))
            .map(|(_, (c, _))| c)
            .collect()
    }
}

/// Sink that keeps the whole workbook in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    sheets: Vec<MemorySheet>,
    styles: Vec<StyleSpec>,
    style_index: HashMap<StyleSpec, StyleHandle>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn style(&self, handle: StyleHandle) -> Option<&StyleSpec> {
        self.styles.get(handle.0)
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    fn sheet_mut(&mut self, id: SheetId) -> Result<&mut MemorySheet, SinkError> {
        self.sheets.get_mut(id.0).ok_or(SinkError::UnknownSheet(id))
    }
}

impl ReportSink for MemorySink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError> {
        if self.sheet(name).is_some() {
            return Err(SinkError::DuplicateSheet(name.to_string()));
        }
        self.sheets.push(MemorySheet {
            name: name.to_string(),
            ..Default::default()
        });
        Ok(SheetId(self.sheets.len() - 1))
    }

    fn define_style(&mut self, spec: &StyleSpec) -> Result<StyleHandle, SinkError> {
        if let Some(handle) = self.style_index.get(spec) {
            return Ok(*handle);
        }
        let handle = StyleHandle(self.styles.len());
        self.styles.push(spec.clone());
        self.style_index.insert(spec.clone(), handle);
        Ok(handle)
    }

    fn write_cell(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        cell: &Cell,
        style: Option<StyleHandle>,
    ) -> Result<(), SinkError> {
        cell.validate(row, col)?;
        if let Some(handle) = style {
            if handle.0 >= self.styles.len() {
                return Err(SinkError::UnknownStyle(handle));
            }
        }
        self.sheet_mut(sheet)?
            .cells
            .insert((row, col), (cell.clone(), style));
        Ok(())
    }

    fn set_column_width(
        &mut self,
        sheet: SheetId,
        col: Col,
        width: f64,
    ) -> Result<(), SinkError> {
        self.sheet_mut(sheet)?.column_widths.insert(col, width);
        Ok(())
    }

    fn set_autofilter(
        &mut self,
        sheet: SheetId,
        row: Row,
        first_col: Col,
        last_col: Col,
    ) -> Result<(), SinkError> {
        self.sheet_mut(sheet)?.autofilter = Some((row, first_col, last_col));
        Ok(())
    }

    fn freeze_rows(&mut self, sheet: SheetId, rows: Row) -> Result<(), SinkError> {
        self.sheet_mut(sheet)?.frozen_rows = Some(rows);
        Ok(())
    }

    fn insert_chart(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        chart: &ChartSpec,
    ) -> Result<(), SinkError> {
        self.sheet_mut(sheet)?.charts.push((row, col, chart.clone()));
        Ok(())
    }
}
