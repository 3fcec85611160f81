//! Sheet: a score spreadsheet described in YAML.
//!
//! ```yaml
//! title: Ode
//! rows:
//!   - [{ text: "Nom: Ode;" }, { text: "Instrument: Piano." }]
//!   - [{ image: cells/clef.png }, { symbol: Note_H5 }, { symbol: BATON_FIN_PORTEE }]
//!   - [{ text: FIN }]
//! ```
//!
//! Cells are visited row by row, left to right. Image paths are relative to
//! the sheet file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notation::source::{CellSource, ImageHandle};
use crate::notation::symbol::ReferenceSymbol;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("cannot read sheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sheet: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Content of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Text(String),
    Image(PathBuf),
    /// A picture already identified as a reference symbol.
    Symbol(ReferenceSymbol),
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SheetFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    rows: Vec<Vec<Cell>>,
}

/// A loaded sheet and its read cursor.
#[derive(Debug, Clone)]
pub struct Sheet {
    title: Option<String>,
    cells: Vec<Cell>,
    base_dir: PathBuf,
    cursor: usize,
    /// Byte offset into the current text cell.
    offset: usize,
}

impl Sheet {
    /// Build a sheet from rows of cells; image paths stay as given.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            title: None,
            cells: rows.into_iter().flatten().collect(),
            base_dir: PathBuf::new(),
            cursor: 0,
            offset: 0,
        }
    }

    /// Parse a YAML sheet; relative image paths resolve against `base_dir`.
    pub fn from_yaml(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self, SheetError> {
        let file: SheetFile = serde_yaml::from_str(yaml)?;
        let mut sheet = Self::from_rows(file.rows);
        sheet.title = file.title;
        sheet.base_dir = base_dir.into();
        Ok(sheet)
    }

    /// Load a YAML sheet from disk.
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let content = std::fs::read_to_string(path).map_err(|source| SheetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&content, base_dir)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn current(&self) -> Option<&Cell> {
        self.cells.get(self.cursor)
    }

    fn advance(&mut self) {
        if self.cursor < self.cells.len() {
            self.cursor += 1;
        }
        self.offset = 0;
    }
}

impl CellSource for Sheet {
    fn has_text(&self) -> bool {
        matches!(self.current(), Some(Cell::Text(_)))
    }

    fn has_image(&self) -> bool {
        matches!(self.current(), Some(Cell::Image(_) | Cell::Symbol(_)))
    }

    fn next_char(&mut self) -> Option<char> {
        let next = match self.current() {
            Some(Cell::Text(text)) => text.get(self.offset..).and_then(|rest| rest.chars().next()),
            _ => None,
        };
        match next {
            Some(c) => {
                self.offset += c.len_utf8();
                Some(c)
            }
            None => {
                self.advance();
                None
            }
        }
    }

    fn take_image(&mut self) -> Option<ImageHandle> {
        let image = match self.current() {
            Some(Cell::Image(path)) => Some(ImageHandle::File(self.base_dir.join(path))),
            Some(Cell::Symbol(symbol)) => Some(ImageHandle::Known(*symbol)),
            _ => None,
        };
        self.advance();
        image
    }

    fn skip_cell(&mut self) {
        self.advance();
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.cells.len()
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }
}
