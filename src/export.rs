use crate::error::Result;
use crate::models::MatchResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 12] = [
    "Line",
    "Quantity",
    "Reference Designator",
    "LCSC Part Number",
    "Manufacturer",
    "MPN",
    "Description",
    "Match Score",
    "Match Method",
    "Confidence",
    "Alternatives",
    "Notes",
];

/// 写出匹配结果 CSV
pub fn write_results<W: Write>(writer: W, results: &[MatchResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    for result in results {
        let selected = result.selected.as_ref();
        let alternatives = result
            .alternatives
            .iter()
            .map(|r| r.code.as_str())
            .collect::<Vec<_>>()
            .join(";");

        writer.write_record([
            result.line.raw_text.clone(),
            result.line.quantity.map(|q| q.to_string()).unwrap_or_default(),
            result.line.reference_designator.clone().unwrap_or_default(),
            selected.map(|r| r.code.clone()).unwrap_or_default(),
            selected.map(|r| r.brand.clone()).unwrap_or_default(),
            selected.map(|r| r.model.clone()).unwrap_or_default(),
            selected.map(|r| r.description.clone()).unwrap_or_default(),
            format!("{:.1}%", result.score),
            result.method.as_str().to_string(),
            result.confidence_level().as_str().to_string(),
            alternatives,
            result.note.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 导出匹配结果到 CSV 文件
pub fn export_to_csv(results: &[MatchResult], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    write_results(file, results)?;
    tracing::info!("Exported {} BOM lines to {}", results.len(), output_path.display());
    Ok(())
}
