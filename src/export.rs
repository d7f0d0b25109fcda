//! CSV export of the record store.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::record::Record;
use crate::{Error, Result};

pub const EXPORT_HEADER: [&str; 5] = ["Name", "Address", "Website", "Email", "State"];

/// Serializes `records` sorted by name.
///
/// Equal names keep their store order. Every data field is quoted and embedded
/// quotes are doubled; rows end with `\n` except the last one.
/// Returns [`Error::EmptyExport`] when there is nothing to write.
pub fn export(records: &[Record]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(Error::EmptyExport);
    }

    // `sort_by_cached_key` is stable.
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_cached_key(|r| (fmt_sortable_entry(&r.name), r.name.clone()));

    let mut out = EXPORT_HEADER.join(",").into_bytes();
    out.push(b'\n');

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    for r in sorted {
        wtr.write_record([
            r.name.as_str(),
            r.address.as_str(),
            r.website.as_str(),
            r.contact.as_deref().unwrap_or(""),
            r.region.as_str(),
        ])?;
    }
    let mut out = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;

    if out.last() == Some(&b'\n') {
        out.pop();
    }
    Ok(out)
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("scraped_data_{date}.csv")
}

/// Writes the export to `dir/scraped_data_<date>.csv` and returns the path.
pub async fn export_to_dir(dir: &Path, records: &[Record], date: NaiveDate) -> Result<PathBuf> {
    let bytes = export(records)?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(date));
    let mut file = File::create(&path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;

    tracing::info!(path = %path.display(), records = records.len(), "wrote export");
    Ok(path)
}

/// Converts letters with accents to letters without accents so that names
/// sort the way a reader expects, regardless of case.
#[inline]
fn fmt_sortable_entry(token: &str) -> String {
    token
        .to_lowercase()
        .replace(['á', 'à', 'â', 'ã', 'ä', 'å'], "a")
        .replace(['ç', 'č', 'ć'], "c")
        .replace(['é', 'è', 'ê', 'ë'], "e")
        .replace(['í', 'ì', 'î', 'ï'], "i")
        .replace(['ó', 'ò', 'ô', 'õ', 'ö'], "o")
        .replace(['š'], "s")
        .replace(['ú', 'ù', 'û', 'ü'], "u")
        .replace(['ý', 'ÿ'], "y")
        .replace(['ž'], "z")
        .replace(['ñ'], "n")
        .replace(['ŕ'], "r")
}
