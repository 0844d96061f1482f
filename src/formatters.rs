//! Rendering of a ranked result for the terminal, JSON or CSV consumers

use std::io::Write;

use serde::Serialize;

use crate::config::OutputFormat;
use crate::ranking::RankedEntry;

/// One output row with its 1-based rank
#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    rank: usize,
    key: &'a str,
    count: u64,
}

fn rows(entries: &[RankedEntry]) -> impl Iterator<Item = RankedRow<'_>> {
    entries.iter().enumerate().map(|(i, entry)| RankedRow {
        rank: i + 1,
        key: &entry.key,
        count: entry.count,
    })
}

/// Write `entries` to `writer` in the requested format
pub fn render_ranking<W: Write>(
    format: OutputFormat,
    group_by: &str,
    entries: &[RankedEntry],
    writer: W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Default => render_text(group_by, entries, writer),
        OutputFormat::Json => render_json(entries, writer),
        OutputFormat::Csv => render_csv(entries, writer),
    }
}

fn render_text<W: Write>(group_by: &str, entries: &[RankedEntry], mut writer: W) -> anyhow::Result<()> {
    writeln!(writer, "Top {} by {}:", entries.len(), group_by)?;
    for row in rows(entries) {
        writeln!(writer, "{}. {}: {} messages", row.rank, row.key, row.count)?;
    }
    writer.flush()?;
    Ok(())
}

fn render_json<W: Write>(entries: &[RankedEntry], mut writer: W) -> anyhow::Result<()> {
    let rows: Vec<RankedRow<'_>> = rows(entries).collect();
    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn render_csv<W: Write>(entries: &[RankedEntry], writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    // serialize() only emits the header once a row exists
    csv_writer.write_record(["rank", "key", "count"])?;
    for row in rows(entries) {
        csv_writer.write_record([row.rank.to_string(), row.key.to_string(), row.count.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<RankedEntry> {
        vec![RankedEntry::new("A", 2), RankedEntry::new("B", 1)]
    }

    fn render(format: OutputFormat, entries: &[RankedEntry]) -> String {
        let mut out = Vec::new();
        render_ranking(format, "name", entries, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_format() {
        assert_eq!(
            render(OutputFormat::Default, &sample()),
            "Top 2 by name:\n1. A: 2 messages\n2. B: 1 messages\n"
        );
    }

    #[test]
    fn test_default_format_empty() {
        assert_eq!(render(OutputFormat::Default, &[]), "Top 0 by name:\n");
    }

    #[test]
    fn test_json_format() {
        let output = render(OutputFormat::Json, &sample());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"rank": 1, "key": "A", "count": 2},
                {"rank": 2, "key": "B", "count": 1}
            ])
        );
    }

    #[test]
    fn test_csv_format_quotes_keys() {
        let entries = vec![RankedEntry::new("Doe, Jane", 3)];
        assert_eq!(
            render(OutputFormat::Csv, &entries),
            "rank,key,count\n1,\"Doe, Jane\",3\n"
        );
    }

    #[test]
    fn test_csv_format_empty_has_header() {
        assert_eq!(render(OutputFormat::Csv, &[]), "rank,key,count\n");
    }
}
