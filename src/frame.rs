//! Tabular event frames
//!
//! An [`EventFrame`] holds the events of one or more games column by
//! column. Columns start out as floats when every non-empty cell parses as a
//! number and as strings otherwise; [`EventFrame::convert_types`] then
//! coerces named columns to the types given in a [`TypeMapping`].

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use thiserror::Error;

use crate::record::EventRecord;

/// Target type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ColumnType {
    Str,
    Int,
    Float,
    Bool,
}

impl FromStr for ColumnType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "str" | "string" | "object" | "text" => Ok(ColumnType::Str),
            "int" | "int64" | "integer" | "i8" => Ok(ColumnType::Int),
            "float" | "float64" | "f8" | "double" => Ok(ColumnType::Float),
            "bool" | "boolean" | "flag" => Ok(ColumnType::Bool),
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Str => f.write_str("str"),
            ColumnType::Int => f.write_str("int"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Bool => f.write_str("bool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("Cannot convert column {column}: row {row} value {value:?} is not {target}")]
    Coercion {
        column: String,
        row: usize,
        value: String,
        target: ColumnType,
    },

    #[error("Unknown column type: {0}")]
    UnknownType(String),
}

pub type FrameResult<T> = Result<T, FrameError>;

/// Ordered column name → type mapping
pub type TypeMapping = Vec<(String, ColumnType)>;

/// Types of the standard cwevent columns.
///
/// Player and team identifiers, pitch sequences and play text stay strings.
pub const EVENT_DATA_TYPES: &[(&str, ColumnType)] = &[
    ("GAME_ID", ColumnType::Str),
    ("AWAY_TEAM_ID", ColumnType::Str),
    ("INN_CT", ColumnType::Int),
    ("BAT_HOME_ID", ColumnType::Int),
    ("OUTS_CT", ColumnType::Int),
    ("BALLS_CT", ColumnType::Int),
    ("STRIKES_CT", ColumnType::Int),
    ("PITCH_SEQ_TX", ColumnType::Str),
    ("AWAY_SCORE_CT", ColumnType::Int),
    ("HOME_SCORE_CT", ColumnType::Int),
    ("BAT_ID", ColumnType::Str),
    ("BAT_HAND_CD", ColumnType::Str),
    ("RESP_BAT_ID", ColumnType::Str),
    ("RESP_BAT_HAND_CD", ColumnType::Str),
    ("PIT_ID", ColumnType::Str),
    ("PIT_HAND_CD", ColumnType::Str),
    ("RESP_PIT_ID", ColumnType::Str),
    ("RESP_PIT_HAND_CD", ColumnType::Str),
    ("POS2_FLD_ID", ColumnType::Str),
    ("POS3_FLD_ID", ColumnType::Str),
    ("POS4_FLD_ID", ColumnType::Str),
    ("POS5_FLD_ID", ColumnType::Str),
    ("POS6_FLD_ID", ColumnType::Str),
    ("POS7_FLD_ID", ColumnType::Str),
    ("POS8_FLD_ID", ColumnType::Str),
    ("POS9_FLD_ID", ColumnType::Str),
    ("BASE1_RUN_ID", ColumnType::Str),
    ("BASE2_RUN_ID", ColumnType::Str),
    ("BASE3_RUN_ID", ColumnType::Str),
    ("EVENT_TX", ColumnType::Str),
    ("LEADOFF_FL", ColumnType::Bool),
    ("PH_FL", ColumnType::Bool),
    ("BAT_FLD_CD", ColumnType::Int),
    ("BAT_LINEUP_ID", ColumnType::Int),
    ("EVENT_CD", ColumnType::Int),
    ("BAT_EVENT_FL", ColumnType::Bool),
    ("AB_FL", ColumnType::Bool),
    ("H_CD", ColumnType::Int),
    ("SH_FL", ColumnType::Bool),
    ("SF_FL", ColumnType::Bool),
    ("EVENT_OUTS_CT", ColumnType::Int),
    ("DP_FL", ColumnType::Bool),
    ("TP_FL", ColumnType::Bool),
    ("RBI_CT", ColumnType::Int),
    ("WP_FL", ColumnType::Bool),
    ("PB_FL", ColumnType::Bool),
    ("FLD_CD", ColumnType::Int),
    ("BATTEDBALL_CD", ColumnType::Str),
    ("BUNT_FL", ColumnType::Bool),
    ("FOUL_FL", ColumnType::Bool),
    ("BATTEDBALL_LOC_TX", ColumnType::Str),
    ("ERR_CT", ColumnType::Int),
    ("ERR1_FLD_CD", ColumnType::Int),
    ("ERR1_CD", ColumnType::Str),
    ("ERR2_FLD_CD", ColumnType::Int),
    ("ERR2_CD", ColumnType::Str),
    ("ERR3_FLD_CD", ColumnType::Int),
    ("ERR3_CD", ColumnType::Str),
    ("BAT_DEST_ID", ColumnType::Int),
    ("RUN1_DEST_ID", ColumnType::Int),
    ("RUN2_DEST_ID", ColumnType::Int),
    ("RUN3_DEST_ID", ColumnType::Int),
    ("BAT_PLAY_TX", ColumnType::Str),
    ("RUN1_PLAY_TX", ColumnType::Str),
    ("RUN2_PLAY_TX", ColumnType::Str),
    ("RUN3_PLAY_TX", ColumnType::Str),
    ("RUN1_SB_FL", ColumnType::Bool),
    ("RUN2_SB_FL", ColumnType::Bool),
    ("RUN3_SB_FL", ColumnType::Bool),
    ("RUN1_CS_FL", ColumnType::Bool),
    ("RUN2_CS_FL", ColumnType::Bool),
    ("RUN3_CS_FL", ColumnType::Bool),
    ("RUN1_PK_FL", ColumnType::Bool),
    ("RUN2_PK_FL", ColumnType::Bool),
    ("RUN3_PK_FL", ColumnType::Bool),
    ("RUN1_RESP_PIT_ID", ColumnType::Str),
    ("RUN2_RESP_PIT_ID", ColumnType::Str),
    ("RUN3_RESP_PIT_ID", ColumnType::Str),
    ("GAME_NEW_FL", ColumnType::Bool),
    ("GAME_END_FL", ColumnType::Bool),
    ("PR_RUN1_FL", ColumnType::Bool),
    ("PR_RUN2_FL", ColumnType::Bool),
    ("PR_RUN3_FL", ColumnType::Bool),
    ("REMOVED_FOR_PR_RUN1_ID", ColumnType::Str),
    ("REMOVED_FOR_PR_RUN2_ID", ColumnType::Str),
    ("REMOVED_FOR_PR_RUN3_ID", ColumnType::Str),
    ("REMOVED_FOR_PH_BAT_ID", ColumnType::Str),
    ("REMOVED_FOR_PH_BAT_FLD_CD", ColumnType::Int),
    ("PO1_FLD_CD", ColumnType::Int),
    ("PO2_FLD_CD", ColumnType::Int),
    ("PO3_FLD_CD", ColumnType::Int),
    ("ASS1_FLD_CD", ColumnType::Int),
    ("ASS2_FLD_CD", ColumnType::Int),
    ("ASS3_FLD_CD", ColumnType::Int),
    ("ASS4_FLD_CD", ColumnType::Int),
    ("ASS5_FLD_CD", ColumnType::Int),
    ("EVENT_ID", ColumnType::Int),
];

/// [`EVENT_DATA_TYPES`] as an owned mapping
pub fn event_data_types() -> TypeMapping {
    EVENT_DATA_TYPES
        .iter()
        .map(|(name, ty)| (name.to_string(), *ty))
        .collect()
}

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(true) => f.write_str("T"),
            Value::Bool(false) => f.write_str("F"),
        }
    }
}

/// Parse one cell as `ty`. Empty cells are null except for strings.
pub fn coerce(raw: &str, ty: ColumnType) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() && ty != ColumnType::Str {
        return Some(Value::Null);
    }
    match ty {
        ColumnType::Str => Some(Value::Str(raw.to_string())),
        ColumnType::Int => {
            if let Ok(v) = trimmed.parse::<i64>() {
                return Some(Value::Int(v));
            }
            let f = trimmed.parse::<f64>().ok()?;
            if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Some(Value::Int(f as i64))
            } else {
                None
            }
        }
        ColumnType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        ColumnType::Bool => match trimmed.to_lowercase().as_str() {
            "t" | "true" | "1" => Some(Value::Bool(true)),
            "f" | "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
    }
}

/// One named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    raw: Vec<String>,
    values: Vec<Value>,
}

impl Column {
    fn from_raw(name: String, raw: Vec<String>) -> Self {
        let numeric = raw
            .iter()
            .all(|v| v.trim().is_empty() || v.trim().parse::<f64>().is_ok());
        // A column of empty cells carries no evidence of being numeric.
        let any_value = raw.iter().any(|v| !v.trim().is_empty());
        let ty = if numeric && any_value {
            ColumnType::Float
        } else {
            ColumnType::Str
        };
        let values = raw
            .iter()
            .map(|v| coerce(v, ty).unwrap_or(Value::Null))
            .collect();
        Self {
            name,
            ty,
            raw,
            values,
        }
    }

    fn convert(&mut self, ty: ColumnType) -> FrameResult<()> {
        let mut values = Vec::with_capacity(self.raw.len());
        for (row, raw) in self.raw.iter().enumerate() {
            match coerce(raw, ty) {
                Some(v) => values.push(v),
                None => {
                    return Err(FrameError::Coercion {
                        column: self.name.clone(),
                        row,
                        value: raw.clone(),
                        target: ty,
                    })
                }
            }
        }
        self.values = values;
        self.ty = ty;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Text exactly as it came from the record
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Events laid out as typed columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFrame {
    columns: Vec<Column>,
    rows: usize,
}

impl EventFrame {
    /// Build a frame; columns are the union of record headers in
    /// first-seen order and missing cells are empty.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EventRecord>) -> Self {
        let records: Vec<&EventRecord> = records.into_iter().collect();

        let mut order: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for record in &records {
            for header in record.headers() {
                if !index.contains_key(header) {
                    index.insert(header.to_string(), order.len());
                    order.push(header.to_string());
                }
            }
        }

        let mut raw: Vec<Vec<String>> = vec![vec![String::new(); records.len()]; order.len()];
        for (row, record) in records.iter().enumerate() {
            for (header, value) in record.iter() {
                raw[index[header]][row] = value.to_string();
            }
        }

        let columns = order
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column::from_raw(name, cells))
            .collect();

        Self {
            columns,
            rows: records.len(),
        }
    }

    /// Coerce each mapped column present in the frame.
    ///
    /// Mapped names absent from the frame are ignored. On failure the
    /// offending column keeps its previous type.
    pub fn convert_types(&mut self, mapping: &[(String, ColumnType)]) -> FrameResult<()> {
        for (name, ty) in mapping {
            if let Some(column) = self.columns.iter_mut().find(|c| &c.name == name) {
                if let Err(e) = column.convert(*ty) {
                    tracing::error!(column = %name, error = %e, "Cannot convert column");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row(&self, row: usize) -> Option<FrameRow<'_>> {
        (row < self.rows).then_some(FrameRow { frame: self, row })
    }

    pub fn rows(&self) -> impl Iterator<Item = FrameRow<'_>> {
        (0..self.rows).map(move |row| FrameRow { frame: self, row })
    }

    /// Write a header line and one line per row.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let header: Vec<String> = self.columns.iter().map(|c| csv_field(&c.name)).collect();
        writeln!(writer, "{}", header.join(","))?;
        for row in self.rows() {
            let line: Vec<String> = row
                .iter()
                .map(|(_, v)| csv_field(&v.to_string()))
                .collect();
            writeln!(writer, "{}", line.join(","))?;
        }
        Ok(())
    }
}

/// A borrowed row of an [`EventFrame`]
#[derive(Clone, Copy)]
pub struct FrameRow<'a> {
    frame: &'a EventFrame,
    row: usize,
}

impl<'a> FrameRow<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.frame.column(column).and_then(|c| c.get(self.row))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let (frame, row) = (self.frame, self.row);
        frame
            .columns
            .iter()
            .map(move |c| (c.name.as_str(), &c.values[row]))
    }
}

impl Serialize for FrameRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.frame.columns.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn csv_field(s: &str) -> String {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
