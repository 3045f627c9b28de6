//! Excel workbook sink backed by `rust_xlsxwriter`

use crate::sink::{
    Cell, ChartSpec, Col, ReportSink, Row, SheetId, SinkError, StyleHandle, StyleSpec,
};
use rust_xlsxwriter::{
    Chart, ChartLegendPosition, ChartType, Color, Format, FormatPattern, Workbook, Worksheet,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Writes report sheets into an in-progress `.xlsx` workbook
pub struct XlsxSink {
    workbook: Workbook,
    formats: Vec<Format>,
    style_index: HashMap<StyleSpec, StyleHandle>,
    sheet_names: Vec<String>,
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxSink {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            formats: Vec::new(),
            style_index: HashMap::new(),
            sheet_names: Vec::new(),
        }
    }

    /// Write the workbook to disk
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SinkError> {
        let path = path.as_ref();
        self.workbook.save(path)?;
        debug!(path = %path.display(), sheets = self.sheet_names.len(), "Workbook saved");
        Ok(())
    }

    fn worksheet(&mut self, id: SheetId) -> Result<&mut Worksheet, SinkError> {
        if id.0 >= self.sheet_names.len() {
            return Err(SinkError::UnknownSheet(id));
        }
        Ok(self.workbook.worksheet_from_index(id.0)?)
    }
}

fn build_format(spec: &StyleSpec) -> Format {
    let mut format = Format::new();
    if spec.bold {
        format = format.set_bold();
    }
    if let Some(size) = spec.font_size {
        format = format.set_font_size(size);
    }
    if let Some(num_format) = &spec.num_format {
        format = format.set_num_format(num_format);
    }
    if let Some(rgb) = spec.fill_rgb {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(rgb));
    }
    format
}

impl ReportSink for XlsxSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError> {
        if self.sheet_names.iter().any(|n| n == name) {
            return Err(SinkError::DuplicateSheet(name.to_string()));
        }
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(name)?;
        self.sheet_names.push(name.to_string());
        Ok(SheetId(self.sheet_names.len() - 1))
    }

    fn define_style(&mut self, spec: &StyleSpec) -> Result<StyleHandle, SinkError> {
        if let Some(handle) = self.style_index.get(spec) {
            return Ok(*handle);
        }
        let handle = StyleHandle(self.formats.len());
        self.formats.push(build_format(spec));
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
        let format = match style {
            Some(handle) => Some(
                self.formats
                    .get(handle.0)
                    .cloned()
                    .ok_or(SinkError::UnknownStyle(handle))?,
            ),
            None => None,
        };
        let ws = self.worksheet(sheet)?;

        match (cell, &format) {
            (Cell::Text(s), Some(f)) => ws.write_string_with_format(row, col, s, f)?,
            (Cell::Text(s), None) => ws.write_string(row, col, s)?,
            (Cell::Number(n), Some(f)) => ws.write_number_with_format(row, col, *n, f)?,
            (Cell::Number(n), None) => ws.write_number(row, col, *n)?,
            (Cell::Integer(i), Some(f)) => ws.write_number_with_format(row, col, *i as f64, f)?,
            (Cell::Integer(i), None) => ws.write_number(row, col, *i as f64)?,
            (Cell::Formula(expr), Some(f)) => {
                ws.write_formula_with_format(row, col, expr.as_str(), f)?
            }
            (Cell::Formula(expr), None) => ws.write_formula(row, col, expr.as_str())?,
            (Cell::Blank, Some(f)) => ws.write_blank(row, col, f)?,
            (Cell::Blank, None) => ws,
        };
        Ok(())
    }

    fn set_column_width(
        &mut self,
        sheet: SheetId,
        col: Col,
        width: f64,
    ) -> Result<(), SinkError> {
        self.worksheet(sheet)?.set_column_width(col, width)?;
        Ok(())
    }

    fn set_autofilter(
        &mut self,
        sheet: SheetId,
        row: Row,
        first_col: Col,
        last_col: Col,
    ) -> Result<(), SinkError> {
        self.worksheet(sheet)?
            .autofilter(row, first_col, row, last_col)?;
        Ok(())
    }

    fn freeze_rows(&mut self, sheet: SheetId, rows: Row) -> Result<(), SinkError> {
        self.worksheet(sheet)?.set_freeze_panes(rows, 0)?;
        Ok(())
    }

    fn insert_chart(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        spec: &ChartSpec,
    ) -> Result<(), SinkError> {
        let mut chart = Chart::new(ChartType::BarStacked);
        let cats = &spec.categories;
        for series in &spec.series {
            chart
                .add_series()
                .set_name((series.name.sheet.as_str(), series.name.row, series.name.col))
                .set_categories((
                    cats.sheet.as_str(),
                    cats.first_row,
                    cats.col,
                    cats.last_row,
                    cats.col,
                ))
                .set_values((
                    series.values.sheet.as_str(),
                    series.values.first_row,
                    series.values.col,
                    series.values.last_row,
                    series.values.col,
                ));
        }
        chart.title().set_name(spec.title.as_str());
        chart.legend().set_position(ChartLegendPosition::Top);
        chart.set_width(spec.width).set_height(spec.height);

        self.worksheet(sheet)?.insert_chart(row, col, &chart)?;
        Ok(())
    }
}
