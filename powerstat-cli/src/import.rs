use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use log::warn;
use powerstat_db::db::insert_draw;
use powerstat_db::models::{Draw, WHITE_PICK};
use powerstat_db::rusqlite::Connection;

const DATE_COLUMN: &str = "Draw Date";
const NUMBERS_COLUMN: &str = "Winning Numbers";
const MULTIPLIER_COLUMN: &str = "Multiplier";

/// "MM/DD/YYYY"
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y")
        .with_context(|| format!("Invalid date '{}' (expected MM/DD/YYYY)", raw.trim()))
}

/// Six space-separated numbers: five white balls then the powerball.
pub fn parse_numbers(raw: &str) -> Result<(Vec<u8>, u8)> {
    let numbers = raw
        .split_whitespace()
        .map(|s| s.parse::<u8>().with_context(|| format!("Invalid number '{}'", s)))
        .collect::<Result<Vec<u8>>>()?;
    if numbers.len() != WHITE_PICK + 1 {
        bail!("Expected {} numbers, got {} in '{}'", WHITE_PICK + 1, numbers.len(), raw.trim());
    }
    let powerball = numbers[WHITE_PICK];
    Ok((numbers[..WHITE_PICK].to_vec(), powerball))
}

pub fn parse_multiplier(raw: Option<&str>) -> Result<Option<u8>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<u8>()
            .map(Some)
            .with_context(|| format!("Invalid multiplier '{}'", s)),
    }
}

struct Columns {
    date: usize,
    numbers: usize,
    multiplier: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        Self {
            date: find(DATE_COLUMN).unwrap_or(0),
            numbers: find(NUMBERS_COLUMN).unwrap_or(1),
            multiplier: find(MULTIPLIER_COLUMN),
        }
    }
}

fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Result<Draw> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .with_context(|| format!("Missing field at index {}", idx))
    };

    let date = parse_date(get(columns.date)?)?;
    let (white_balls, powerball) = parse_numbers(get(columns.numbers)?)?;
    let multiplier = parse_multiplier(columns.multiplier.and_then(|i| record.get(i)))?;

    Ok(Draw::new(date, &white_balls, powerball, multiplier)?)
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let file = std::fs::File::open(path).with_context(|| format!("Cannot open {:?}", path))?;
    import_reader(conn, file)
}

/// Validates and inserts every record in one transaction. Bad rows are
/// counted and logged, not fatal; existing dates are skipped.
pub fn import_reader<R: Read>(conn: &Connection, input: R) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(input);
    let columns = Columns::from_headers(reader.headers().context("Cannot read CSV header")?);

    let tx = conn
        .unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult::default();

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records + 1;
        match record_result {
            Ok(record) => match parse_record(&record, &columns) {
                Ok(draw) => match insert_draw(&tx, &draw) {
                    Ok(true) => result.inserted += 1,
                    Ok(false) => result.skipped += 1,
                    Err(e) => {
                        warn!("line {line}: insert failed: {e:#}");
                        result.errors += 1;
                    }
                },
                Err(e) => {
                    warn!("line {line}: skipped: {e:#}");
                    result.errors += 1;
                }
            },
            Err(e) => {
                warn!("line {line}: unreadable: {e}");
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerstat_db::db::{count_draws, fetch_draws, migrate};

    const SAMPLE: &str = "\
Draw Date,Winning Numbers,Multiplier
09/26/2020,11 21 27 36 62 24,3
09/30/2020,14 18 36 49 67 18,2
10/03/2020,18 31 36 43 47 20,
10/03/2020,18 31 36 43 47 20,2
10/07/2020,06 24 30 53 56 19,2
10/10/2020,05 18 23 40 50 18,70
10/14/2020,11 11 22 33 44 5,2
13/45/2020,1 2 3 4 5 6,2
";

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("09/26/2020").unwrap(), NaiveDate::from_ymd_opt(2020, 9, 26).unwrap());
        assert_eq!(parse_date(" 01/02/2021 ").unwrap(), NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        assert!(parse_date("2020-09-26").is_err());
        assert!(parse_date("26/09/2020").is_err());
    }

    #[test]
    fn test_parse_numbers() {
        let (whites, pb) = parse_numbers("11 21 27 36 62 24").unwrap();
        assert_eq!(whites, vec![11, 21, 27, 36, 62]);
        assert_eq!(pb, 24);
        assert!(parse_numbers("11 21 27 36 62").is_err());
        assert!(parse_numbers("11 21 27 36 62 24 3").is_err());
        assert!(parse_numbers("11 21 x 36 62 24").is_err());
    }

    #[test]
    fn test_parse_multiplier() {
        assert_eq!(parse_multiplier(None).unwrap(), None);
        assert_eq!(parse_multiplier(Some("  ")).unwrap(), None);
        assert_eq!(parse_multiplier(Some("3")).unwrap(), Some(3));
        assert!(parse_multiplier(Some("x")).is_err());
    }

    #[test]
    fn test_import_sample() {
        let conn = memory_db();
        let result = import_reader(&conn, SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            result,
            ImportResult {
                total_records: 8,
                inserted: 5,
                skipped: 1,
                errors: 2,
            }
        );
        assert_eq!(count_draws(&conn).unwrap(), 5);

        let draws = fetch_draws(&conn).unwrap();
        assert_eq!(draws[0].white_balls, [11, 21, 27, 36, 62]);
        assert_eq!(draws[0].powerball, 24);
        assert_eq!(draws[0].multiplier, Some(3));
        assert_eq!(draws[2].multiplier, None);
    }

    #[test]
    fn test_reimport_skips_everything() {
        let conn = memory_db();
        import_reader(&conn, SAMPLE.as_bytes()).unwrap();
        let again = import_reader(&conn, SAMPLE.as_bytes()).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 6);
        assert_eq!(count_draws(&conn).unwrap(), 5);
    }

    #[test]
    fn test_columns_by_header_name() {
        let conn = memory_db();
        let csv = "Multiplier,Winning Numbers,Draw Date\n2,01 02 03 04 05 06,01/06/2021\n";
        let result = import_reader(&conn, csv.as_bytes()).unwrap();
        assert_eq!(result.inserted, 1);
        let draws = fetch_draws(&conn).unwrap();
        assert_eq!(draws[0].date, NaiveDate::from_ymd_opt(2021, 1, 6).unwrap());
        assert_eq!(draws[0].powerball, 6);
    }
}
