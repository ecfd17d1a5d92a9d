// Persistence round trips through `DirStorage`: write, reopen, compare.
use std::collections::HashSet;

use rowdb::api::{Database, DirStorage, ForeignKey, LinkStatus, LocalClient, Relationship};

fn robots_db(storage: DirStorage) -> Database {
    let mut db = Database::open(storage, "Robots").expect("open");
    db.add_table("Robot", &["id", "year", "function"]).expect("robot");
    db.add_row("Robot", &["i%1", "i%2016", "s%spaceExploration"])
        .expect("row");
    db.add_row("Robot", &["i%2", "i%2017", "s%"]).expect("row");
    db.add_row("Robot", &["i%3", "i%2018", "s%farming"]).expect("row");
    db.add_table_with_foreign_key(
        "Seller",
        ForeignKey::new("Robot", "id", "robot"),
        &["name", "robot", "active"],
    )
    .expect("seller");
    db.add_row("Seller", &["s%ann", "i%1", "b%1"]).expect("row");
    db.add_row("Seller", &["s%bob", "i%3", "b%0"]).expect("row");
    db
}

#[test]
fn written_database_reloads_identically() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    let db = robots_db(storage.clone());
    db.write().expect("write");

    let reopened = Database::open(storage, "Robots").expect("reopen");
    let names: HashSet<&str> = reopened.table_names().into_iter().collect();
    let expected: HashSet<&str> = db.table_names().into_iter().collect();
    assert_eq!(names, expected);
    for table in db.tables() {
        let loaded = reopened.table(table.name()).expect("table");
        assert_eq!(loaded.column_names(), table.column_names());
        assert_eq!(loaded.primary_keys(), table.primary_keys());
        for (left, right) in table.rows().zip(loaded.rows()) {
            assert_eq!(left.values(), right.values());
            assert_eq!(left.types(), right.types());
        }
    }
    let reopened_fks: HashSet<Relationship> = reopened.foreign_keys().into_iter().collect();
    let expected_fks: HashSet<Relationship> = db.foreign_keys().into_iter().collect();
    assert_eq!(reopened_fks, expected_fks);
    assert_eq!(
        reopened.foreign_keys(),
        vec![Relationship {
            table: "Seller".to_string(),
            foreign_key: ForeignKey::new("Robot", "id", "robot"),
        }]
    );
}

#[test]
fn reopened_foreign_keys_resolve_to_primary_cells() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    robots_db(storage.clone()).write().expect("write");

    let db = Database::open(storage, "Robots").expect("reopen");
    assert_eq!(db.link_reports().len(), 1);
    assert_eq!(db.link_reports()[0].status, LinkStatus::Linked { links: 3 });

    let seller = db.table("Seller").expect("seller");
    let item = seller.item("bob", "robot").expect("cell");
    let reference = item.reference().expect("resolved reference");
    assert_eq!(reference.table, "Robot");
    let target = db.reference_target(reference).expect("target cell");
    assert_eq!(target.value(), Some("3"));
}

#[test]
fn null_cells_survive_the_file_format() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    robots_db(storage.clone()).write().expect("write");

    let text = std::fs::read_to_string(temp.path().join("Robots").join("Robot.txt"))
        .expect("table file");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Robot");
    assert_eq!(lines[1], "s%id s%year s%function ");
    assert_eq!(lines[3], "i%2 i%2017 s% ");

    let db = Database::open(storage, "Robots").expect("reopen");
    let item = db.table("Robot").and_then(|t| t.item("2", "function"));
    assert_eq!(item.map(|i| i.value()), Some(None));
}

#[test]
fn tables_reload_in_file_name_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    let mut db = Database::open(storage.clone(), "letters").expect("open");
    db.add_table("Zed", &["k"]).expect("zed");
    db.add_table("Alpha", &["k"]).expect("alpha");
    assert_eq!(db.table_names(), vec!["Zed", "Alpha"]);
    db.write().expect("write");

    let reopened = Database::open(storage, "letters").expect("reopen");
    assert_eq!(reopened.table_names(), vec!["Alpha", "Zed"]);
}

#[test]
fn empty_values_and_keys_survive_reload() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    let mut db = Database::open(storage.clone(), "blanks").expect("open");
    db.add_table("Note", &["k", "text"]).expect("table");
    assert!(db.add_row("Note", &["", "x"]).is_err());
    db.add_row("Note", &["a", ""]).expect("row");
    db.add_row("Note", &["b", "y"]).expect("row");
    let before: Vec<Vec<Option<&str>>> = db
        .table("Note")
        .expect("table")
        .rows()
        .map(|row| row.values())
        .collect();
    assert_eq!(before, vec![vec![Some("a"), None], vec![Some("b"), Some("y")]]);
    db.write().expect("write");

    let reopened = Database::open(storage, "blanks").expect("reopen");
    let after: Vec<Vec<Option<&str>>> = reopened
        .table("Note")
        .expect("table")
        .rows()
        .map(|row| row.values())
        .collect();
    assert_eq!(after, before);
}

#[test]
fn empty_database_directory_loads_empty() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(temp.path().join("bare")).expect("dir");
    let storage = DirStorage::new(temp.path());

    let db = Database::open(storage, "bare").expect("open");
    assert_eq!(db.table_count(), 0);
    assert!(db.foreign_keys().is_empty());
    assert!(db.link_reports().is_empty());
}

#[test]
fn missing_fk_table_on_disk_is_reported_not_fatal() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    robots_db(storage.clone()).write().expect("write");
    std::fs::remove_file(temp.path().join("Robots").join("Robot.txt")).expect("remove");

    let db = Database::open(storage, "Robots").expect("reopen");
    assert!(db.table("Robot").is_none());
    let report = &db.link_reports()[0];
    assert_eq!(
        report.status,
        LinkStatus::MissingTarget {
            table: "Robot".to_string(),
            column: None,
        }
    );
}

#[test]
fn client_sees_databases_written_through_the_library() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = DirStorage::new(temp.path());
    robots_db(storage).write().expect("write");

    let client = LocalClient::new().with_root(temp.path());
    assert_eq!(client.list_databases().expect("list"), vec!["Robots"]);
    let db = client.open_database("Robots").expect("open");
    assert_eq!(db.table("Seller").map(|t| t.len()), Some(2));
}
