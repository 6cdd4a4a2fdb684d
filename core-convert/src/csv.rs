//! Delimited text (CSV / TSV) to a Markdown table, or to normalized CSV.

use async_trait::async_trait;
use std::path::Path;

use core_runtime::config::TableOutput;

use crate::converter::{display_name, display_stem, file_extension, ConversionOutcome, Converter};
use crate::error::{ConvertError, Result};

pub struct CsvConverter {
    output: TableOutput,
    /// Rows rendered into the Markdown table; `None` renders all
    max_rows: Option<usize>,
}

impl CsvConverter {
    pub fn new(output: TableOutput) -> Self {
        Self {
            output,
            max_rows: None,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Pick the delimiter occurring most often on the first line.
    fn sniff_delimiter(text: &str) -> u8 {
        let first = text.lines().next().unwrap_or_default();
        [b',', b';', b'\t', b'|']
            .into_iter()
            .max_by_key(|d| first.matches(char::from(*d)).count())
            .filter(|d| first.contains(char::from(*d)))
            .unwrap_or(b',')
    }

    /// Records of `text`; rows may differ in length and blank lines are
    /// dropped.
    pub(crate) fn parse(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| ConvertError::Parse(format!("CSV: {}", e)))
            })
            .collect()
    }

    fn escape_cell(cell: &str) -> String {
        cell.replace('|', "\\|").replace('\n', "<br>")
    }

    fn render_markdown(&self, source: &Path, rows: &[Vec<String>]) -> String {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let data_rows = rows.len().saturating_sub(1);
        let shown = self.max_rows.map_or(data_rows, |max| data_rows.min(max));
        let truncated = shown < data_rows;

        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("source_file: {}\n", display_name(source)));
        out.push_str(&format!(
            "original_format: {}\n",
            file_extension(source).unwrap_or_default()
        ));
        out.push_str(&format!("rows: {}\n", data_rows));
        out.push_str(&format!("columns: {}\n", columns));
        out.push_str(&format!("truncated: {}\n", truncated));
        out.push_str("converted_by: CsvConverter\n");
        out.push_str("---\n\n");
        out.push_str(&format!("# {}\n\n", display_stem(source)));
        out.push_str(&format!("**Size:** {} rows x {} columns\n\n", data_rows, columns));

        if columns == 0 {
            out.push_str("_Empty table_\n");
            return out;
        }

        let cells = |row: &Vec<String>| -> String {
            let mut line = String::from("|");
            for i in 0..columns {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                line.push(' ');
                line.push_str(&Self::escape_cell(cell));
                line.push_str(" |");
            }
            line.push('\n');
            line
        };

        out.push_str(&cells(&rows[0]));
        out.push('|');
        out.push_str(&"---|".repeat(columns));
        out.push('\n');
        for row in rows.iter().skip(1).take(shown) {
            out.push_str(&cells(row));
        }

        if truncated {
            out.push_str(&format!("\n_Showing the first {} of {} rows._\n", shown, data_rows));
        }
        out
    }

    fn render_csv(rows: &[Vec<String>]) -> Result<String> {
        let mut writer = ::csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| ConvertError::Parse(format!("CSV: {}", e)))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ConvertError::Parse(format!("CSV: {}", e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl Converter for CsvConverter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(file_extension(path).as_deref(), Some(".csv") | Some(".tsv"))
    }

    fn target_extension(&self) -> &'static str {
        match self.output {
            TableOutput::Markdown => "md",
            TableOutput::Csv => "csv",
        }
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let bytes = tokio::fs::read(input).await?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let delimiter = if file_extension(input).as_deref() == Some(".tsv") {
            b'\t'
        } else {
            Self::sniff_delimiter(text)
        };
        let rows = Self::parse(text, delimiter)?;

        let rendered = match self.output {
            TableOutput::Markdown => self.render_markdown(input, &rows),
            TableOutput::Csv => Self::render_csv(&rows)?,
        };
        tokio::fs::write(output, rendered).await?;
        Ok(ConversionOutcome::Completed)
    }
}
