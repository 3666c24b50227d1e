use super::ExportError;
use std::io::Write;
use std::path::Path;

/// Write any serializable value as pretty JSON
pub fn write_json<T, W>(data: &T, mut writer: W) -> Result<(), ExportError>
where
    T: serde::Serialize,
    W: Write,
{
    let json_data = serde_json::to_string_pretty(data)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;

    writer.write_all(json_data.as_bytes())?;
    writer.write_all(b"\n")?;

    Ok(())
}

/// Export any serializable data structure to a JSON file
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let file = std::fs::File::create(output_path)?;
    write_json(data, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_report;
    use tempfile::NamedTempFile;

    #[test]
    fn test_report_json_shape() {
        let mut buffer = Vec::new();
        write_json(&sample_report(), &mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["athlete_id"], "p7");
        assert_eq!(value["acwr"][1]["ratio"], serde_json::Value::Null);
        assert_eq!(value["alerts"][0]["severity"], "error");
        assert_eq!(value["alerts"][0]["alert_type"], "acwr");
        assert_eq!(value["alerts"][0]["date"], "2024-09-03");
    }

    #[test]
    fn test_export_json_file() {
        let temp_file = NamedTempFile::new().unwrap();
        export_json(&vec![sample_report()], temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"threshold\": \"> 1.5\""));
    }
}
