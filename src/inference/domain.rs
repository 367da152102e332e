//! Scoring envelope: request decoding and the response shape.
//!
//! Requests look like `{"data": [{"Mes": 1, "Titulo": "..", "Assunto": ".."}]}`.
//! The column-oriented form `{"data": {"Mes": [..], "Titulo": [..], ..}}` is
//! accepted as well. Keys other than the feature columns are ignored. A
//! request without rows is rejected: an empty table has no feature columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::{SalesError, SalesResult};
use crate::data::domain::{FeatureRow, COL_MONTH, COL_SUBJECT, COL_TITLE, FEATURE_COLUMNS};

pub const DATA_KEY: &str = "data";

/// Either the predictions, aligned with the input rows, or a flattened error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreResponse {
    Predictions { predictions: Vec<f64> },
    Error { error: String },
}

impl ScoreResponse {
    pub fn error(err: &SalesError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }

    pub fn predictions(&self) -> Option<&[f64]> {
        match self {
            Self::Predictions { predictions } => Some(predictions),
            Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Decode a raw request body into feature rows.
pub fn parse_request(raw: &str) -> SalesResult<Vec<FeatureRow>> {
    let body: Value = serde_json::from_str(raw)?;
    let data = match body {
        Value::Object(mut obj) => obj
            .remove(DATA_KEY)
            .ok_or_else(|| SalesError::invalid(format!("request has no {DATA_KEY:?} key")))?,
        other => {
            return Err(SalesError::invalid(format!(
                "request must be a JSON object, got {}",
                kind(&other)
            )))
        }
    };

    match data {
        Value::Array(rows) if rows.is_empty() => {
            Err(SalesError::missing_column(FEATURE_COLUMNS.join(", ")))
        }
        Value::Array(rows) => rows
            .iter()
            .enumerate()
            .map(|(idx, row)| match row {
                Value::Object(obj) => row_from_object(idx, obj),
                other => Err(SalesError::invalid(format!(
                    "row {idx} must be an object, got {}",
                    kind(other)
                ))),
            })
            .collect(),
        Value::Object(columns) => rows_from_columns(&columns),
        other => Err(SalesError::invalid(format!(
            "{DATA_KEY:?} must be a list of rows, got {}",
            kind(&other)
        ))),
    }
}

fn row_from_object(idx: usize, obj: &Map<String, Value>) -> SalesResult<FeatureRow> {
    let field = |column: &str| {
        obj.get(column)
            .ok_or_else(|| SalesError::missing_column(format!("{column} (row {idx})")))
    };
    Ok(FeatureRow {
        month: month_value(field(COL_MONTH)?, idx)?,
        title: category_value(field(COL_TITLE)?, COL_TITLE, idx)?,
        subject: category_value(field(COL_SUBJECT)?, COL_SUBJECT, idx)?,
    })
}

fn rows_from_columns(columns: &Map<String, Value>) -> SalesResult<Vec<FeatureRow>> {
    let mut lists = Vec::with_capacity(FEATURE_COLUMNS.len());
    for column in FEATURE_COLUMNS {
        match columns.get(column) {
            Some(Value::Array(values)) => lists.push(values),
            Some(other) => {
                return Err(SalesError::invalid(format!(
                    "column {column} must be a list, got {}",
                    kind(other)
                )))
            }
            None => return Err(SalesError::missing_column(column)),
        }
    }
    let (months, titles, subjects) = (lists[0], lists[1], lists[2]);
    if months.len() != titles.len() || months.len() != subjects.len() {
        return Err(SalesError::invalid("columns have different lengths"));
    }
    if months.is_empty() {
        return Err(SalesError::invalid(format!("{DATA_KEY:?} has no rows")));
    }

    (0..months.len())
        .map(|idx| {
            Ok(FeatureRow {
                month: month_value(&months[idx], idx)?,
                title: category_value(&titles[idx], COL_TITLE, idx)?,
                subject: category_value(&subjects[idx], COL_SUBJECT, idx)?,
            })
        })
        .collect()
}

/// Numbers, or strings holding a number.
fn month_value(value: &Value, idx: usize) -> SalesResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|m| m.is_finite())
        .ok_or_else(|| SalesError::invalid(format!("row {idx}: {COL_MONTH} is not a number: {value}")))
}

/// Strings as-is; numbers and booleans by their JSON text.
fn category_value(value: &Value, column: &str, idx: usize) -> SalesResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(SalesError::invalid(format!(
            "row {idx}: {column} must be a string, got {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_objects() {
        let rows = parse_request(
            r#"{"data": [
                {"Mes": 3, "Titulo": "Iracema", "Assunto": "Romance", "Loja": "Centro"},
                {"Mes": "4", "Titulo": 1984, "Assunto": "Ficção"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                FeatureRow::new(3.0, "Iracema", "Romance"),
                FeatureRow::new(4.0, "1984", "Ficção"),
            ]
        );
    }

    #[test]
    fn parses_columns() {
        let rows = parse_request(
            r#"{"data": {"Mes": [1, 2], "Titulo": ["a", "b"], "Assunto": ["x", "y"]}}"#,
        )
        .unwrap();
        assert_eq!(rows[1], FeatureRow::new(2.0, "b", "y"));
    }

    #[test]
    fn empty_data_is_rejected() {
        let err = parse_request(r#"{"data": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "missing column: Mes, Titulo, Assunto");
        assert!(parse_request(r#"{"data": {"Mes": [], "Titulo": [], "Assunto": []}}"#).is_err());
    }

    #[test]
    fn missing_column_names_row() {
        let err = parse_request(r#"{"data": [{"Mes": 1, "Titulo": "a"}]}"#).unwrap_err();
        assert_eq!(err.to_string(), "missing column: Assunto (row 0)");
    }

    #[test]
    fn malformed_requests() {
        assert!(matches!(parse_request("not json"), Err(SalesError::Json(_))));
        assert!(parse_request("[]").is_err());
        assert!(parse_request(r#"{"rows": []}"#).is_err());
        assert!(parse_request(r#"{"data": 5}"#).is_err());
        assert!(parse_request(r#"{"data": [1]}"#).is_err());
        assert!(parse_request(r#"{"data": [{"Mes": "jan", "Titulo": "a", "Assunto": "b"}]}"#).is_err());
        assert!(parse_request(r#"{"data": [{"Mes": 1, "Titulo": null, "Assunto": "b"}]}"#).is_err());
        assert!(parse_request(
            r#"{"data": {"Mes": [1], "Titulo": ["a", "b"], "Assunto": ["x"]}}"#
        )
        .is_err());
    }

    #[test]
    fn response_shapes() {
        let ok = ScoreResponse::Predictions {
            predictions: vec![1.5, 2.0],
        };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"predictions":[1.5,2.0]}"#);

        let err = ScoreResponse::error(&SalesError::missing_column("Mes"));
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"error":"missing column: Mes"}"#
        );
        assert!(err.is_error());
        assert_eq!(ok.predictions(), Some(&[1.5, 2.0][..]));
    }
}
