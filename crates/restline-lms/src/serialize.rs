//! Dataset serialization for the object sink

use serde_json::Value;

use crate::dataset::OutputFormat;
use crate::error::ExtractError;
use crate::page::Record;

pub fn serialize(format: OutputFormat, records: &[Record]) -> Result<Vec<u8>, ExtractError> {
    match format {
        OutputFormat::JsonLines => to_json_lines(records),
        OutputFormat::Csv => to_csv(records),
    }
}

/// One JSON object per line
pub fn to_json_lines(records: &[Record]) -> Result<Vec<u8>, ExtractError> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)
            .map_err(|e| ExtractError::Serialize(e.to_string()))?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Header row plus one row per record.
///
/// Columns are the union of record keys in first-seen order; a record missing
/// a column gets an empty cell.
pub fn to_csv(records: &[Record]) -> Result<Vec<u8>, ExtractError> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    let to_err = |e: csv::Error| ExtractError::Serialize(e.to_string());
    writer.write_record(&columns).map_err(to_err)?;
    for record in records {
        let row = columns
            .iter()
            .map(|col| record.get(*col).map_or_else(String::new, cell));
        writer.write_record(row).map_err(to_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExtractError::Serialize(e.to_string()))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn json_lines_one_object_per_line() {
        let records = vec![rec(json!({"a": 1})), rec(json!({"a": 2, "b": "x"}))];
        let out = String::from_utf8(to_json_lines(&records).unwrap()).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"a\":2,\"b\":\"x\"}\n");
    }

    #[test]
    fn json_lines_empty() {
        assert!(to_json_lines(&[]).unwrap().is_empty());
    }

    #[test]
    fn csv_union_of_columns_in_first_seen_order() {
        let records = vec![
            rec(json!({"user_id": 1, "name": "Ann"})),
            rec(json!({"name": "Bo", "award": "gold"})),
        ];
        let out = String::from_utf8(to_csv(&records).unwrap()).unwrap();
        assert_eq!(out, "user_id,name,award\n1,Ann,\n,Bo,gold\n");
    }

    #[test]
    fn csv_quotes_and_non_string_values() {
        let records = vec![rec(json!({"note": "a, b", "ok": true, "score": 9.5, "x": null}))];
        let out = String::from_utf8(to_csv(&records).unwrap()).unwrap();
        assert_eq!(out, "note,ok,score,x\n\"a, b\",true,9.5,\n");
    }

    #[test]
    fn format_dispatch() {
        let records = vec![rec(json!({"a": 1}))];
        assert_eq!(
            serialize(OutputFormat::Csv, &records).unwrap(),
            b"a\n1\n".to_vec()
        );
        assert_eq!(
            serialize(OutputFormat::JsonLines, &records).unwrap(),
            b"{\"a\":1}\n".to_vec()
        );
    }
}
