//! Export / re-import round trips across column types and CSV options.

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestDatabase, samples_db, sorted_display_rows};
    use anyhow::Result;
    use hre_core::Value;
    use hre_tablesync::{
        CsvOptions, RowSet, SyncOptions, SyncProgress, TableSyncService, TextQualifier,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Rows ordered by their first (ID) column
    fn rows_by_id(rows: RowSet) -> Vec<Vec<Value>> {
        let mut rows = rows.rows;
        rows.sort_by_key(|row| row[0].as_i64());
        rows
    }

    fn round_trip(service: &TableSyncService, db: &TestDatabase, table: &str) -> Result<()> {
        let before = rows_by_id(service.select_all(table)?);
        let path = db.file("round_trip.csv");

        let exported = service.export_csv(table, &path)?;
        assert_eq!(exported, before.len() as u64);
        service.delete_all(table)?;
        let imported = service.import_csv(table, &path)?;
        assert_eq!(imported, exported);

        assert_eq!(rows_by_id(service.select_all(table)?), before);
        Ok(())
    }

    #[rstest]
    #[case::semicolon(CsvOptions::default())]
    #[case::comma(CsvOptions::default().with_delimiter(','))]
    #[case::tab_with_header(CsvOptions::default().with_delimiter('\t').with_header(true))]
    #[case::single_quote(CsvOptions { text_qualifier: TextQualifier::SingleQuote, ..CsvOptions::default() })]
    fn test_samples_round_trip(samples_db: TestDatabase, #[case] csv: CsvOptions) -> Result<()> {
        let service = samples_db.service_with(SyncOptions {
            csv,
            ..Default::default()
        });
        round_trip(&service, &samples_db, "SAMPLES")
    }

    #[rstest]
    fn test_export_quotes_only_where_needed(samples_db: TestDatabase) -> Result<()> {
        let path = samples_db.file("samples.csv");
        samples_db.service().export_csv("SAMPLES", &path)?;
        let contents = std::fs::read_to_string(&path)?;

        assert!(contents.contains("1;plain;\"multi\nline\";1.5;12.5;1;1900-02-28;1900-02-28 10:15:00;dead;1.234\n"));
        assert!(contents.contains("2;\"semi;colon\";\"say \"\"hi\"\"\";-0.25;3;0;"));
        // Empty string is quoted, NULLs are bare empty fields.
        assert!(contents.contains("3;\"\";;;;;;;;\n"));
        Ok(())
    }

    #[rstest]
    fn test_empty_string_and_null_stay_distinct(samples_db: TestDatabase) -> Result<()> {
        let service = samples_db.service();
        round_trip(&service, &samples_db, "SAMPLES")?;

        let rows = rows_by_id(service.select_all("SAMPLES")?);
        assert_eq!(rows[2][1], Value::String(String::new()));
        assert!(rows[2][2..].iter().all(Value::is_null));
        Ok(())
    }

    #[rstest]
    fn test_binary_column_round_trips_bytes(samples_db: TestDatabase) -> Result<()> {
        let service = samples_db.service();
        round_trip(&service, &samples_db, "SAMPLES")?;

        let rows = rows_by_id(service.select_all("SAMPLES")?);
        assert_eq!(rows[0][8], Value::Bytes(vec![0xde, 0xad]));
        assert_eq!(rows[1][8], Value::Bytes(vec![0x00, 0xff]));
        Ok(())
    }

    #[rstest]
    fn test_declared_scale_keeps_full_value(samples_db: TestDatabase) -> Result<()> {
        let service = samples_db.service();
        round_trip(&service, &samples_db, "SAMPLES")?;

        let rows = rows_by_id(service.select_all("SAMPLES")?);
        assert_eq!(rows[0][9], Value::Float64(1.234));
        Ok(())
    }

    /// Values SQLite stores although they break the declared type
    const LOOSE_SCHEMA: &str = indoc! {"
        CREATE TABLE LOOSE (ID INTEGER, SHORT VARCHAR(3), AMOUNT INTEGER, CODE, TAG CHAR(1));
        INSERT INTO LOOSE VALUES (1, 'Anna', 4.5, '007', 'xyz');
        INSERT INTO LOOSE VALUES (2, 'Bo', 99999999999, 'abc', 'y');
    "};

    #[rstest]
    fn test_loosely_typed_rows_round_trip() -> Result<()> {
        let db = TestDatabase::with_schema(LOOSE_SCHEMA)?;
        let service = db.service();
        round_trip(&service, &db, "LOOSE")?;

        let rows = rows_by_id(service.select_all("LOOSE")?);
        assert_eq!(
            rows[0],
            vec![
                Value::Int64(1),
                Value::String("Anna".into()),
                Value::Float64(4.5),
                Value::String("007".into()),
                Value::String("xyz".into()),
            ]
        );
        assert_eq!(rows[1][2], Value::Int64(99999999999));
        Ok(())
    }

    #[rstest]
    fn test_export_empty_table_writes_nothing() -> Result<()> {
        let db = TestDatabase::with_schema("CREATE TABLE EMPTY (A INTEGER, B VARCHAR);")?;
        let path = db.file("empty.csv");
        assert_eq!(db.service().export_csv("EMPTY", &path)?, 0);
        assert_eq!(std::fs::read_to_string(&path)?, "");
        assert_eq!(db.service().import_csv("EMPTY", &path)?, 0);
        Ok(())
    }

    #[rstest]
    fn test_import_accepts_crlf_and_bom() -> Result<()> {
        let db = TestDatabase::with_schema("CREATE TABLE PEOPLE (ID INTEGER, NAME VARCHAR(40), BIRTH DOUBLE);")?;
        let path = db.write_file("windows.csv", "\u{feff}1;Anna;1900\r\n2;Bo;\r\n")?;
        let service = db.service();

        assert_eq!(service.import_csv("PEOPLE", &path)?, 2);
        assert_eq!(
            sorted_display_rows(&service, "PEOPLE")?,
            vec![vec!["1", "Anna", "1900"], vec!["2", "Bo", ""]]
        );
        Ok(())
    }

    #[rstest]
    fn test_large_import_reports_progress() -> Result<()> {
        use std::sync::{Arc, Mutex};

        let db = TestDatabase::with_schema("CREATE TABLE SERIES (N INTEGER, SQUARE BIGINT);")?;
        let contents: String = (0..2500).map(|n: i64| format!("{};{}\n", n, n * n)).collect();
        let path = db.write_file("series.csv", contents)?;

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let service = db.service().with_progress_callback(Box::new(move |p: SyncProgress| {
            sink.lock().unwrap().push((p.rows_processed, p.finished))
        }));

        assert_eq!(service.import_csv("SERIES", &path)?, 2500);
        assert_eq!(
            *reports.lock().unwrap(),
            vec![(1000, false), (2000, false), (2500, true)]
        );
        assert_eq!(service.row_count("SERIES")?, 2500);
        Ok(())
    }
}
