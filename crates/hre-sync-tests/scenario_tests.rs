//! PEOPLE table scenario tests.
//!
//! Covers the select / export / delete / re-import cycle on a small table and
//! the catalog shape invariants:
//! - described column count equals the width of every selected row
//! - exported lines use `;` and leave NULL fields empty
//! - re-importing an export reproduces the original rows

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestDatabase, people_db, sorted_display_rows};
    use anyhow::Result;
    use hre_tablesync::{ColumnType, TableChangeEvent, TableChangeKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    #[rstest]
    fn test_select_all_returns_both_rows(people_db: TestDatabase) -> Result<()> {
        let service = people_db.service();
        assert_eq!(
            sorted_display_rows(&service, "PEOPLE")?,
            vec![vec!["1", "Anna", "1900"], vec!["2", "Bo", ""]]
        );
        Ok(())
    }

    #[rstest]
    fn test_describe_people(people_db: TestDatabase) -> Result<()> {
        let columns = people_db.service().describe_columns("PEOPLE")?;
        let types: Vec<ColumnType> = columns.iter().map(|c| c.sql_type.clone()).collect();
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Varchar, ColumnType::Double]
        );
        let ordinals: Vec<usize> = columns.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        Ok(())
    }

    #[rstest]
    #[case::single_column("CREATE TABLE T (A VARCHAR); INSERT INTO T VALUES ('x');", 1)]
    #[case::untyped("CREATE TABLE T (A, B); INSERT INTO T VALUES (1, 'b');", 2)]
    #[case::reordered(
        "CREATE TABLE T (Z INTEGER, A VARCHAR, M DOUBLE); INSERT INTO T (M, Z) VALUES (1.5, 7);",
        3
    )]
    #[case::empty("CREATE TABLE T (A INTEGER, B INTEGER);", 2)]
    fn test_row_width_matches_description(#[case] schema: &str, #[case] width: usize) -> Result<()> {
        let db = TestDatabase::with_schema(schema)?;
        let service = db.service();

        let columns = service.describe_columns("T")?;
        assert_eq!(columns.len(), width);

        let rows = service.select_all("T")?;
        assert_eq!(rows.columns, columns);
        assert!(rows.rows.iter().all(|row| row.len() == width));
        Ok(())
    }

    #[rstest]
    fn test_export_writes_semicolon_lines(people_db: TestDatabase) -> Result<()> {
        let path = people_db.file("people.csv");
        assert_eq!(people_db.service().export_csv("PEOPLE", &path)?, 2);

        let contents = std::fs::read_to_string(&path)?;
        let mut lines: Vec<&str> = contents.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["1;Anna;1900", "2;Bo;"]);
        assert!(contents.ends_with('\n'));
        Ok(())
    }

    #[rstest]
    fn test_export_delete_reimport(people_db: TestDatabase) -> Result<()> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let service = people_db.service().with_change_listener(Box::new(
            move |event: &TableChangeEvent| sink.lock().unwrap().push(event.clone()),
        ));
        let path = people_db.file("people.csv");
        let before = sorted_display_rows(&service, "PEOPLE")?;

        service.export_csv("PEOPLE", &path)?;
        assert_eq!(service.delete_all("PEOPLE")?, 2);
        assert!(service.select_all("PEOPLE")?.is_empty());
        assert_eq!(service.import_csv("PEOPLE", &path)?, 2);
        assert_eq!(sorted_display_rows(&service, "PEOPLE")?, before);

        let kinds: Vec<(TableChangeKind, u64)> =
            events.lock().unwrap().iter().map(|e| (e.kind, e.rows)).collect();
        assert_eq!(
            kinds,
            vec![(TableChangeKind::Deleted, 2), (TableChangeKind::Imported, 2)]
        );
        Ok(())
    }

    #[rstest]
    fn test_null_birth_stays_null(people_db: TestDatabase) -> Result<()> {
        let service = people_db.service();
        let path = people_db.file("people.csv");
        service.export_csv("PEOPLE", &path)?;
        service.delete_all("PEOPLE")?;
        service.import_csv("PEOPLE", &path)?;

        let rows = service.select_all("PEOPLE")?;
        let bo = rows
            .rows
            .iter()
            .find(|row| row[1].as_str() == Some("Bo"))
            .expect("Bo was re-imported");
        assert!(bo[2].is_null());
        Ok(())
    }

    #[rstest]
    fn test_list_tables_reports_counts(people_db: TestDatabase) -> Result<()> {
        let tables = people_db.service().list_tables()?;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "PEOPLE");
        assert_eq!(tables[0].row_count, 2);
        Ok(())
    }

    #[rstest]
    fn test_reopened_file_sees_imported_rows(people_db: TestDatabase) -> Result<()> {
        let path = people_db.write_file("more.csv", "3;Cy;1950\n")?;
        people_db.service().import_csv("PEOPLE", &path)?;

        let reopened = hre_driver_sqlite::SqliteConnection::open_existing(
            people_db.path().to_str().unwrap(),
        )?;
        let service = hre_tablesync::TableSyncService::new(Arc::new(reopened));
        assert_eq!(service.row_count("PEOPLE")?, 3);
        Ok(())
    }
}
