//! Tabular reconstruction
//!
//! Lines are split into cells by an ordered chain of delimiter strategies;
//! the first strategy that yields at least two non-empty cells wins. Rows
//! are independent: no alignment across rows beyond optional padding.

use serde::Serialize;

pub type Row = Vec<String>;

/// A delimiter strategy: `Some(cells)` when it recognises the line
pub type SplitStrategy = fn(&str) -> Option<Row>;

/// Strategies in priority order. New delimiters go here.
pub const SPLIT_STRATEGIES: &[SplitStrategy] = &[split_on_pipe, split_on_tab, split_on_spaces];

fn accept(cells: impl Iterator<Item = String>) -> Option<Row> {
    let cells: Row = cells.filter(|c| !c.is_empty()).collect();
    (cells.len() >= 2).then_some(cells)
}

pub fn split_on_pipe(line: &str) -> Option<Row> {
    accept(line.split('|').map(|c| c.trim().to_string()))
}

pub fn split_on_tab(line: &str) -> Option<Row> {
    accept(line.split('\t').map(|c| c.trim().to_string()))
}

/// Split on runs of two or more consecutive spaces
pub fn split_on_spaces(line: &str) -> Option<Row> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0;

    for ch in line.chars() {
        if ch == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= 2 {
            cells.push(std::mem::take(&mut current));
        } else if spaces == 1 {
            current.push(' ');
        }
        spaces = 0;
        current.push(ch);
    }
    cells.push(current);

    accept(cells.into_iter().map(|c| c.trim().to_string()))
}

/// Split one line into cells. A blank line yields an empty row.
pub fn split_line(line: &str) -> Row {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    SPLIT_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(trimmed))
        .unwrap_or_else(|| vec![trimmed.to_string()])
}

/// Split every non-blank line into a row
pub fn lines_to_rows<S: AsRef<str>>(lines: &[S]) -> Vec<Row> {
    lines
        .iter()
        .map(|line| split_line(line.as_ref()))
        .filter(|row| !row.is_empty())
        .collect()
}

/// Header candidate: the first line of the first page, accepted only when
/// the split chain produces two or more cells
pub fn detect_header<S: AsRef<str>>(first_page_lines: &[S]) -> Option<Row> {
    let row = split_line(first_page_lines.first()?.as_ref());
    (row.len() >= 2).then_some(row)
}

/// Row shape applied when a grid is finalised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Rows keep the cell count their line produced
    #[default]
    Ragged,
    /// Every row is padded with trailing empty cells to the widest row
    Rectangular,
}

/// One spreadsheet's worth of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    pub header: Option<Row>,
    pub rows: Vec<Row>,
}

impl Grid {
    /// Header (if any) followed by data rows
    pub fn all_rows(&self) -> impl Iterator<Item = &Row> {
        self.header.iter().chain(self.rows.iter())
    }

    /// Widest row, header included
    pub fn width(&self) -> usize {
        self.all_rows().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.rows.is_empty()
    }

    fn pad(&mut self) {
        let width = self.width();
        for row in self.header.iter_mut().chain(self.rows.iter_mut()) {
            row.resize(width, String::new());
        }
    }
}

/// Accumulates pages, in order, into a single grid
#[derive(Debug, Default)]
pub struct GridBuilder {
    grid: Grid,
    pages: usize,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page's lines. On the first page, the first line becomes the
    /// header when it splits into two or more cells. Either way it is also
    /// kept as the first data row, so an accepted header appears twice.
    pub fn push_page<S: AsRef<str>>(&mut self, lines: &[S]) {
        if self.pages == 0 {
            self.grid.header = detect_header(lines);
        }
        self.pages += 1;
        self.grid.rows.extend(lines_to_rows(lines));
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn build(mut self, padding: Padding) -> Grid {
        if padding == Padding::Rectangular {
            self.grid.pad();
        }
        self.grid
    }
}
