use crate::error::Result;
use crate::types::ValidatedRecord;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// One CSV row. Field order here is the exported column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub company_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub source_url: String,
    pub source_platform: String,
    pub status_verified: bool,
}

impl From<&ValidatedRecord> for CsvRow {
    fn from(v: &ValidatedRecord) -> Self {
        let rec = &v.record;
        Self {
            company_name: rec.company_name.clone(),
            phone: rec.phone.as_parsed().unwrap_or_default().to_string(),
            email: rec.email.as_parsed().unwrap_or_default().to_string(),
            city: rec.location.city.clone(),
            region: rec.location.region.clone(),
            country: rec.location.country.clone(),
            source_url: rec.listing_url.clone(),
            source_platform: rec.source.to_string(),
            status_verified: v.status_verified(),
        }
    }
}

/// Serialize the validated stream to CSV. The header row is always written,
/// even for zero records.
pub fn write_csv<W: Write>(records: &[ValidatedRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serde-driven headers only appear with at least one row
        csv_writer.write_record([
            "company_name",
            "phone",
            "email",
            "city",
            "region",
            "country",
            "source_url",
            "source_platform",
            "status_verified",
        ])?;
    }
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the validated stream to a CSV file at `path`.
pub fn write_csv_file(records: &[ValidatedRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(records, file)
}

/// Parse rows back out of exported CSV; the round-trip partner of
/// [`write_csv`].
pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<CsvRow>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CheckStatus, Field, Location, LocationConfidence, NormalizedRecord, SourceId,
        ValidationVerdict,
    };
    use chrono::Utc;

    fn sample(name: &str, phone: &str, email: &str) -> ValidatedRecord {
        ValidatedRecord {
            record: NormalizedRecord {
                source: SourceId::TradeIndia,
                company_name: name.into(),
                phone: Field::Parsed(phone.into()),
                email: Field::Parsed(email.into()),
                website: Field::Empty,
                location: Location {
                    city: "Erode".into(),
                    region: "Tamil Nadu".into(),
                    country: "India".into(),
                    confidence: LocationConfidence::High,
                },
                listing_url: "https://www.tradeindia.com/search?page=1".into(),
                fetched_at: Utc::now(),
            },
            verdict: ValidationVerdict {
                email: Some(CheckStatus::Valid),
                phone: Some(CheckStatus::Valid),
                domain: None,
                name: Some(CheckStatus::Valid),
                overall: CheckStatus::Valid,
                confidence: 100,
            },
        }
    }

    #[test]
    fn csv_round_trip_preserves_rows_and_order() {
        let records = vec![
            sample("Abc Trading Pvt. Ltd.", "+919876543210", "info@abc.com"),
            sample("Spice Hub LLP", "+918811223344", "sales@spicehub.in"),
        ];

        let mut buffer = Vec::new();
        write_csv(&records, &mut buffer).unwrap();
        let rows = read_csv(buffer.as_slice()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], CsvRow::from(&records[0]));
        assert_eq!(rows[1], CsvRow::from(&records[1]));
    }

    #[test]
    fn header_is_written_even_for_zero_records() {
        let mut buffer = Vec::new();
        write_csv(&[], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with(
            "company_name,phone,email,city,region,country,source_url,source_platform,status_verified"
        ));
        assert_eq!(read_csv(text.as_bytes()).unwrap().len(), 0);
    }

    #[test]
    fn emitted_rows_are_always_marked_verified() {
        let records = vec![sample("Abc Trading", "+919876543210", "info@abc.com")];
        let mut buffer = Vec::new();
        write_csv(&records, &mut buffer).unwrap();
        let rows = read_csv(buffer.as_slice()).unwrap();
        assert!(rows[0].status_verified);
    }

    #[test]
    fn file_export_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buyers.csv");
        let records = vec![sample("Abc Trading", "+919876543210", "info@abc.com")];
        write_csv_file(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Abc Trading"));
    }
}
