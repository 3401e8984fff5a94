//! Columnar table handed to predictors.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Value kind a column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Integer,
    Float,
    String,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
        })
    }
}

impl Cell {
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Int(_) => CellKind::Integer,
            Self::Float(_) => CellKind::Float,
            Self::Str(_) => CellKind::String,
        }
    }

    /// Numeric value; integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// Integer value; floats only when they carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<f64> for Cell { fn from(v: f64) -> Self { Self::Float(v) } }
impl From<String> for Cell { fn from(v: String) -> Self { Self::Str(v) } }
impl From<&str> for Cell { fn from(v: &str) -> Self { Self::Str(v.to_string()) } }

/// Named columns of equal length. Column order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
}

impl Frame {
    /// One-row frame from `(column, value)` pairs.
    pub fn single_row<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = (S, Cell)>,
        S: Into<String>,
    {
        let mut frame = Self::default();
        for (name, cell) in cells {
            frame.names.push(name.into());
            frame.columns.push(vec![cell]);
        }
        frame
    }

    pub fn height(&self) -> usize { self.columns.first().map_or(0, Vec::len) }

    pub fn width(&self) -> usize { self.names.len() }

    pub fn column_names(&self) -> impl Iterator<Item = &str> { self.names.iter().map(String::as_str) }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.names.iter().position(|n| n == name).map(|idx| self.columns[idx].as_slice())
    }
}
