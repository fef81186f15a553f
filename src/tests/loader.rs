use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::params;

use crate::errors::CoreError;
use crate::models::{
    CellValue, ColumnInfo, ColumnType, ReferenceId, RelationKind, RowExt, SchemaRegistry,
    TableInfo, TableRelation,
};
use crate::resource::IncludeSet;
use crate::tests::{base_registry, test_resource};

const BLOG_SCHEMA: &str = "
CREATE TABLE author (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    name TEXT,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE post (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    title TEXT,
    author_id INTEGER,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE author_author_id_has_post_post_id (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    author_id INTEGER,
    post_id INTEGER,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

fn blog_registry() -> SchemaRegistry {
    let mut registry = base_registry();
    registry.register(
        TableInfo::new("author").with_column(ColumnInfo::new("name", ColumnType::Text)),
    );
    registry.register(
        TableInfo::new("post")
            .with_column(ColumnInfo::new("title", ColumnType::Text))
            .with_column(ColumnInfo::reference("author_id", "author")),
    );
    registry.add_relation(TableRelation::new(RelationKind::HasMany, "author", "post"));
    registry
}

fn insert_author(conn: &rusqlite::Connection, name: &str) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO author (reference_id, name) VALUES (?1, ?2)",
        params![reference.to_string(), name],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

fn insert_post(
    conn: &rusqlite::Connection,
    title: &str,
    author_id: Option<i64>,
) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO post (reference_id, title, author_id) VALUES (?1, ?2, ?3)",
        params![reference.to_string(), title, author_id],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

#[test]
fn test_relation_include_caps_at_fifty_newest_links() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (author_id, author_reference) = insert_author(&conn, "ursula");
    let mut post_references = Vec::new();
    for i in 1..=75i64 {
        let (post_id, post_reference) = insert_post(&conn, &format!("post {}", i), None);
        post_references.push(post_reference);
        conn.execute(
            "INSERT INTO author_author_id_has_post_post_id
             (reference_id, author_id, post_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                ReferenceId::new_v4().to_string(),
                author_id,
                post_id,
                format!("2024-01-01 00:{:02}:{:02}", i / 60, i % 60)
            ],
        )
        .unwrap();
    }

    let (row, includes) = resource
        .single_row_by_reference_id(&conn, "author", &author_reference, &IncludeSet::of(&["post"]))
        .unwrap();

    let listed = match row.get("post_id") {
        Some(CellValue::RefList(listed)) => listed.clone(),
        other => panic!("expected a reference list, got {:?}", other),
    };
    assert_eq!(listed.len(), 50);
    assert_eq!(includes.len(), 50);

    // Ordered by link created_at DESC: the newest link comes first, the
    // oldest 25 links fall past the cap.
    assert_eq!(listed[0], post_references[74].to_string());
    assert_eq!(listed[49], post_references[25].to_string());
    for embedded in &includes {
        assert_eq!(embedded.type_name(), Some("post"));
    }
}

#[test]
fn test_foreign_key_resolves_to_reference_id() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (author_id, author_reference) = insert_author(&conn, "ursula");
    let (_, post_reference) = insert_post(&conn, "a wizard", Some(author_id));

    // Without include the cell becomes the reference id text.
    let (row, includes) = resource
        .single_row_by_reference_id(&conn, "post", &post_reference, &IncludeSet::none())
        .unwrap();
    assert_eq!(
        row.get("author_id"),
        Some(&CellValue::Text(author_reference.to_string()))
    );
    assert!(includes.is_empty());

    // With include the referenced row is embedded as well.
    let (_, includes) = resource
        .single_row_by_reference_id(&conn, "post", &post_reference, &IncludeSet::all())
        .unwrap();
    assert_eq!(includes.len(), 1);
    assert_eq!(includes[0].type_name(), Some("author"));
    assert_eq!(includes[0].reference_id(), Some(author_reference));
}

#[test]
fn test_dangling_foreign_key_leaves_cell_unresolved() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (_, post_reference) = insert_post(&conn, "orphan", Some(404));

    let (row, includes) = resource
        .single_row_by_reference_id(&conn, "post", &post_reference, &IncludeSet::all())
        .unwrap();
    // The parent load survives; the broken edge is simply not resolved.
    assert_eq!(row.get("author_id"), Some(&CellValue::Integer(404)));
    assert!(includes.is_empty());
}

#[test]
fn test_file_column_with_and_without_include() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("a.pdf"), b"hello pdf").unwrap();

    let mut registry = base_registry();
    registry.register(
        TableInfo::new("document").with_column(ColumnInfo::file("attachment")),
    );
    let resource = test_resource(
        "CREATE TABLE document (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference_id TEXT,
            attachment TEXT,
            permission INTEGER DEFAULT 0,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );",
        registry,
    )
    .with_asset_folder("document", "attachment", dir.path().to_path_buf());
    let conn = resource.pool().get().unwrap();

    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO document (reference_id, attachment) VALUES (?1, ?2)",
        params![
            reference.to_string(),
            r#"[{"name":"a.pdf","path":"docs","type":"application/pdf"}]"#
        ],
    )
    .unwrap();

    let (row, includes) = resource
        .single_row_by_reference_id(&conn, "document", &reference, &IncludeSet::none())
        .unwrap();
    let files = match row.get("attachment") {
        Some(CellValue::Files(files)) => files.clone(),
        other => panic!("expected files, got {:?}", other),
    };
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].src.as_deref(), Some("docs/a.pdf"));
    assert!(files[0].contents.is_none());
    assert!(includes.is_empty());

    let (row, includes) = resource
        .single_row_by_reference_id(&conn, "document", &reference, &IncludeSet::of(&["attachment"]))
        .unwrap();
    let files = match row.get("attachment") {
        Some(CellValue::Files(files)) => files.clone(),
        other => panic!("expected files, got {:?}", other),
    };
    assert_eq!(files[0].contents.as_deref(), Some(BASE64.encode(b"hello pdf").as_str()));

    assert_eq!(includes.len(), 1);
    assert_eq!(
        includes[0].get("__type"),
        Some(&CellValue::Text("application/pdf".to_string()))
    );
    assert_eq!(
        includes[0].get("contents"),
        Some(&CellValue::Text(BASE64.encode(b"hello pdf")))
    );
}

#[test]
fn test_crdt_entries_are_dropped_unless_included() {
    let mut registry = base_registry();
    registry.register(
        TableInfo::new("document").with_column(ColumnInfo::file("attachment")),
    );
    let resource = test_resource(
        "CREATE TABLE document (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference_id TEXT,
            attachment TEXT,
            permission INTEGER DEFAULT 0,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );",
        registry,
    );
    let conn = resource.pool().get().unwrap();

    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO document (reference_id, attachment) VALUES (?1, ?2)",
        params![
            reference.to_string(),
            r#"[{"name":"a.pdf","path":"docs","type":"application/pdf"},
                {"name":"doc.yjs","path":"docs","type":"x-crdt/yjs"}]"#
        ],
    )
    .unwrap();

    let (row, _) = resource
        .single_row_by_reference_id(&conn, "document", &reference, &IncludeSet::none())
        .unwrap();
    let files = match row.get("attachment") {
        Some(CellValue::Files(files)) => files.clone(),
        other => panic!("expected files, got {:?}", other),
    };
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name.as_deref(), Some("a.pdf"));

    let (row, _) = resource
        .single_row_by_reference_id(
            &conn,
            "document",
            &reference,
            &IncludeSet::of(&["x-crdt/yjs"]),
        )
        .unwrap();
    let files = match row.get("attachment") {
        Some(CellValue::Files(files)) => files.clone(),
        other => panic!("expected files, got {:?}", other),
    };
    assert_eq!(files.len(), 2);
}

#[test]
fn test_datetime_cells_parse_or_null() {
    let mut registry = base_registry();
    registry.register(
        TableInfo::new("event")
            .with_column(ColumnInfo::new("starts_at", ColumnType::DateTime))
            .with_column(ColumnInfo::new("ends_at", ColumnType::DateTime)),
    );
    let resource = test_resource(
        "CREATE TABLE event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference_id TEXT,
            starts_at TEXT,
            ends_at TEXT,
            permission INTEGER DEFAULT 0,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );",
        registry,
    );
    let conn = resource.pool().get().unwrap();

    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO event (reference_id, starts_at, ends_at) VALUES (?1, '2024-05-01T10:30:00Z', 'whenever')",
        params![reference.to_string()],
    )
    .unwrap();

    let (row, _) = resource
        .single_row_by_reference_id(&conn, "event", &reference, &IncludeSet::none())
        .unwrap();
    match row.get("starts_at") {
        Some(CellValue::DateTime(parsed)) => {
            assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 10:30:00");
        }
        other => panic!("expected parsed datetime, got {:?}", other),
    }
    assert_eq!(row.get("ends_at"), Some(&CellValue::Null));
}

#[test]
fn test_raw_objects_skip_post_processing() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (author_id, _) = insert_author(&conn, "ursula");
    insert_post(&conn, "a wizard", Some(author_id));

    let rows = resource.all_raw_objects(&conn, "post").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].type_name(), Some("post"));
    // Foreign keys stay raw integers.
    assert_eq!(rows[0].get("author_id"), Some(&CellValue::Integer(author_id)));
}

#[test]
fn test_binary_reference_id_is_rendered_as_text() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO author (reference_id, name) VALUES (?1, 'ursula')",
        params![rusqlite::types::Value::Blob(reference.as_bytes().to_vec())],
    )
    .unwrap();

    let (rows, _) = resource
        .rows_by_where(
            &conn,
            "author",
            &IncludeSet::none(),
            &[crate::query::Cond::eq_text("name", "ursula")],
        )
        .unwrap();
    assert_eq!(
        rows[0].get("reference_id"),
        Some(&CellValue::Text(reference.to_string()))
    );
}

#[test]
fn test_random_rows_respects_count() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    for i in 0..10 {
        insert_author(&conn, &format!("author {}", i));
    }

    let rows = resource.random_rows(&conn, "author", 5).unwrap();
    assert!(rows.len() <= 5);
}

#[test]
fn test_object_snapshots_and_column_lookups() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (author_id, author_reference) = insert_author(&conn, "ursula");
    insert_author(&conn, "kazuo");

    let by_reference = resource
        .reference_id_to_object(&conn, "author", &author_reference)
        .unwrap();
    assert_eq!(by_reference.type_name(), Some("author"));
    assert_eq!(
        by_reference.get("name"),
        Some(&CellValue::Text("ursula".to_string()))
    );

    let by_id = resource.id_to_object(&conn, "author", author_id).unwrap();
    assert_eq!(by_id.get("name"), Some(&CellValue::Text("ursula".to_string())));

    let by_where = resource
        .object_by_where(
            &conn,
            "author",
            "name",
            rusqlite::types::Value::Text("kazuo".to_string()),
        )
        .unwrap();
    assert_eq!(by_where.get("name"), Some(&CellValue::Text("kazuo".to_string())));

    let cell = resource
        .reference_id_to_object_column(&conn, "author", &author_reference, "name")
        .unwrap();
    assert_eq!(cell, CellValue::Text("ursula".to_string()));

    let names = resource
        .single_column_values_by_match(
            &conn,
            "author",
            "name",
            "reference_id",
            vec![rusqlite::types::Value::Text(author_reference.to_string())],
        )
        .unwrap();
    assert_eq!(names, vec![CellValue::Text("ursula".to_string())]);
}

#[test]
fn test_single_row_not_found() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let err = resource
        .single_row_by_reference_id(&conn, "post", &ReferenceId::new_v4(), &IncludeSet::none())
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[test]
fn test_direct_insert_applies_default_permission() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let reference = ReferenceId::new_v4();
    let mut data = std::collections::HashMap::new();
    data.insert(
        "reference_id".to_string(),
        CellValue::Text(reference.to_string()),
    );
    data.insert("name".to_string(), CellValue::Text("ursula".to_string()));
    data.insert("permission".to_string(), CellValue::Integer(1));
    data.insert(
        "created_at".to_string(),
        CellValue::Text("2024-05-01 10:30:00".to_string()),
    );
    resource.direct_insert(&conn, "author", &data).unwrap();

    let (row, _) = resource
        .single_row_by_reference_id(&conn, "author", &reference, &IncludeSet::none())
        .unwrap();
    assert_eq!(row.get("name"), Some(&CellValue::Text("ursula".to_string())));
    // The permission cell is forced to the table default, not caller input.
    assert_eq!(
        row.get("permission").and_then(|c| c.as_i64()),
        Some(crate::models::AuthPermission::DEFAULT_PERMISSION.0)
    );
}

#[test]
fn test_truncate_clears_join_table_but_not_objects() {
    let resource = test_resource(BLOG_SCHEMA, blog_registry());
    let conn = resource.pool().get().unwrap();

    let (author_id, _) = insert_author(&conn, "ursula");
    let (post_id, _) = insert_post(&conn, "a wizard", None);
    conn.execute(
        "INSERT INTO author_author_id_has_post_post_id (reference_id, author_id, post_id) VALUES ('l', ?1, ?2)",
        params![author_id, post_id],
    )
    .unwrap();

    resource.truncate_table(&conn, "author", false).unwrap();

    let authors: i64 = conn
        .query_row("SELECT COUNT(*) FROM author", [], |row| row.get(0))
        .unwrap();
    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM author_author_id_has_post_post_id",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let posts: i64 = conn
        .query_row("SELECT COUNT(*) FROM post", [], |row| row.get(0))
        .unwrap();
    assert_eq!(authors, 0);
    assert_eq!(links, 0);
    assert_eq!(posts, 1);
}
