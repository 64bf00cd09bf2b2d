//! # CLI Integration Tests
//!
//! Drive the commands against snapshot files in a temporary directory.

use hkg::cli::{Commands, Settings, load_graph, run};
use hkg::config::HkgConfig;
use hyperknowledge_core::{EntityId, EntityKind, HkError, snapshot_checksum};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPERS
// =============================================================================

fn settings(dir: &TempDir) -> Settings {
    Settings {
        store: dir.path().join("store.json"),
        pretty: false,
        preserved: Vec::new(),
        json_mode: false,
        quiet: false,
    }
}

fn json_settings(dir: &TempDir) -> Settings {
    Settings {
        json_mode: true,
        ..settings(dir)
    }
}

fn exec(settings: &Settings, command: Commands) -> Result<String, HkError> {
    let mut out = Vec::new();
    run(Some(command), settings, &mut out)?;
    Ok(String::from_utf8(out).expect("utf8 output"))
}

fn exec_json(settings: &Settings, command: Commands) -> Value {
    let text = exec(settings, command).expect("command succeeds");
    serde_json::from_str(&text).expect("json output")
}

fn write_input(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).expect("write input");
    path
}

fn fact(subject: &str, predicate: &str, object: &str) -> Commands {
    Commands::Fact {
        subject: subject.to_string(),
        predicate: predicate.to_string(),
        object: object.to_string(),
        parent: None,
    }
}

fn node(id: &str, parent: Option<&str>) -> Value {
    json!({"id": id, "type": "node", "parent": parent})
}

// =============================================================================
// INIT AND STATUS
// =============================================================================

#[test]
fn init_writes_empty_store() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);

    let text = exec(&s, Commands::Init { force: false }).expect("init");
    assert!(text.contains("Initialized"));
    assert!(s.store.exists());
    assert!(load_graph(&s).expect("load").is_empty());
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);
    exec(&s, Commands::Init { force: false }).expect("first init");
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let err = exec(&s, Commands::Init { force: false }).expect_err("exists");
    assert!(matches!(err, HkError::IoError(_)));
    assert!(!load_graph(&s).expect("load").is_empty());

    exec(&s, Commands::Init { force: true }).expect("forced init");
    assert!(load_graph(&s).expect("load").is_empty());
}

#[test]
fn quiet_init_prints_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let s = Settings {
        quiet: true,
        ..settings(&dir)
    };
    let text = exec(&s, Commands::Init { force: false }).expect("init");
    assert!(text.is_empty());
}

#[test]
fn status_reports_counts() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let status = exec_json(&s, Commands::Status);
    // connector + two nodes + link
    assert_eq!(status["entity_count"], json!(4));
    assert_eq!(status["per_kind"]["node"], json!(2));
    assert_eq!(status["settled"], json!(true));
}

#[test]
fn missing_store_reads_as_empty() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let status = exec_json(&s, Commands::Status);
    assert_eq!(status["entity_count"], json!(0));
    assert!(!s.store.exists());
}

#[test]
fn no_subcommand_shows_status() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);
    let mut out = Vec::new();
    run(None, &s, &mut out).expect("status");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Entities: 0"));
}

// =============================================================================
// IMPORT
// =============================================================================

#[test]
fn import_counts_rejections_and_keeps_the_rest() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let input = write_input(
        &dir,
        "batch.json",
        &json!([
            {"id": "ctx", "type": "context", "parent": null},
            node("a", Some("ctx")),
            {"id": "broken", "type": "node"},
            {"id": "bogus", "type": "nonsense", "parent": null},
        ]),
    );

    let report = exec_json(&s, Commands::Import { input });
    assert_eq!(report, json!({"inserted": 2, "updated": 0, "rejected": 2}));

    let graph = load_graph(&s).expect("load");
    assert_eq!(graph.len(), 2);
    assert!(graph.has_id(&EntityId::from("a")));
    assert!(!graph.has_id(&EntityId::from("broken")));
}

#[test]
fn reimport_updates_existing_ids() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let input = write_input(&dir, "one.json", &node("a", None));

    let first = exec_json(&s, Commands::Import { input: input.clone() });
    assert_eq!(first["inserted"], json!(1));
    let second = exec_json(&s, Commands::Import { input });
    assert_eq!(second, json!({"inserted": 0, "updated": 1, "rejected": 0}));
}

#[test]
fn import_accepts_a_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let source = json_settings(&dir);
    exec(&source, fact("alice", "knows", "bob")).expect("fact");

    let other = Settings {
        store: dir.path().join("copy.json"),
        ..json_settings(&dir)
    };
    let report = exec_json(
        &other,
        Commands::Import {
            input: source.store.clone(),
        },
    );
    assert_eq!(report["inserted"], json!(4));
    assert_eq!(report["rejected"], json!(0));

    let original = load_graph(&source).expect("load");
    let copy = load_graph(&other).expect("load");
    assert_eq!(snapshot_checksum(&original), snapshot_checksum(&copy));
}

#[test]
fn import_rejects_missing_and_scalar_files() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);

    let missing = exec(
        &s,
        Commands::Import {
            input: dir.path().join("nope.json"),
        },
    );
    assert!(matches!(missing, Err(HkError::IoError(_))));

    let scalar = write_input(&dir, "scalar.json", &json!(42));
    let err = exec(&s, Commands::Import { input: scalar }).expect_err("scalar");
    assert!(matches!(err, HkError::DeserializationError(_)));

    let directory = exec(
        &s,
        Commands::Import {
            input: dir.path().to_path_buf(),
        },
    );
    assert!(matches!(directory, Err(HkError::IoError(_))));
}

// =============================================================================
// INSPECTION
// =============================================================================

#[test]
fn show_prints_wire_form() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);
    let input = write_input(&dir, "n.json", &node("a", None));
    exec(&s, Commands::Import { input }).expect("import");

    let text = exec(&s, Commands::Show { id: "a".into() }).expect("show");
    let value: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["id"], json!("a"));
    assert_eq!(value["type"], json!("node"));

    let err = exec(&s, Commands::Show { id: "zzz".into() }).expect_err("unknown");
    assert!(matches!(err, HkError::EntityNotFound(_)));
}

#[test]
fn children_lists_members_and_orphans() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let input = write_input(
        &dir,
        "tree.json",
        &json!([
            {"id": "ctx", "type": "context", "parent": null},
            node("a", Some("ctx")),
            node("b", Some("later")),
        ]),
    );
    exec(&s, Commands::Import { input }).expect("import");

    let root = exec_json(&s, Commands::Children { parent: None });
    assert_eq!(root["children"], json!([{"id": "ctx", "type": "context"}]));

    let ctx = exec_json(
        &s,
        Commands::Children {
            parent: Some("ctx".into()),
        },
    );
    assert_eq!(ctx["children"], json!([{"id": "a", "type": "node"}]));

    let waiting = exec_json(
        &s,
        Commands::Children {
            parent: Some("later".into()),
        },
    );
    assert_eq!(waiting["children"], json!([]));
    assert_eq!(waiting["orphans"], json!([{"id": "b", "type": "node"}]));
}

#[test]
fn fact_links_subject_and_object() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let created = exec_json(&s, fact("alice", "knows", "bob"));
    assert_eq!(created["status"], json!("created"));
    let link = created["link"].as_str().expect("link id").to_string();

    let neighbors = exec_json(&s, Commands::Neighbors { id: "alice".into() });
    assert_eq!(neighbors["neighbors"], json!([{"id": link, "type": "link"}]));

    let relations = exec_json(
        &s,
        Commands::Relations {
            connector: "knows".into(),
        },
    );
    assert_eq!(relations["links"][0]["id"], json!(link));
    assert_eq!(
        relations["links"][0]["binds"]["subject"]["alice"],
        json!(["λ"])
    );
}

#[test]
fn repeated_fact_is_not_duplicated() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    let first = exec_json(&s, fact("alice", "knows", "bob"));
    let second = exec_json(&s, fact("alice", "knows", "bob"));

    assert_eq!(second["status"], json!("existing"));
    assert_eq!(second["link"], first["link"]);
    let graph = load_graph(&s).expect("load");
    assert_eq!(graph.count(EntityKind::Link), 1);
}

#[test]
fn preserved_ids_are_not_created() {
    let dir = TempDir::new().expect("tempdir");
    let s = Settings {
        preserved: vec!["bob".to_string()],
        ..json_settings(&dir)
    };
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let graph = load_graph(&s).expect("load");
    assert!(graph.has_id(&EntityId::from("alice")));
    assert!(!graph.has_id(&EntityId::from("bob")));
    assert_eq!(graph.pending_binds(&EntityId::from("bob")).len(), 1);
}

#[test]
fn text_relations_show_roles() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let text = exec(
        &s,
        Commands::Relations {
            connector: "knows".into(),
        },
    )
    .expect("relations");
    assert!(text.contains("subject=alice"));
    assert!(text.contains("object=bob"));
}

// =============================================================================
// REMOVE AND HASH
// =============================================================================

#[test]
fn remove_deletes_and_saves() {
    let dir = TempDir::new().expect("tempdir");
    let s = settings(&dir);
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let text = exec(&s, Commands::Remove { id: "bob".into() }).expect("remove");
    assert!(text.contains("bob"));

    let graph = load_graph(&s).expect("load");
    assert!(!graph.has_id(&EntityId::from("bob")));
    assert_eq!(graph.pending_binds(&EntityId::from("bob")).len(), 1);

    let err = exec(&s, Commands::Remove { id: "bob".into() }).expect_err("gone");
    assert!(matches!(err, HkError::EntityNotFound(_)));
}

#[test]
fn hash_is_stable_across_saves() {
    let dir = TempDir::new().expect("tempdir");
    let s = json_settings(&dir);
    exec(&s, fact("alice", "knows", "bob")).expect("fact");

    let first = exec_json(&s, Commands::Hash);
    let pretty = Settings {
        pretty: true,
        ..json_settings(&dir)
    };
    exec(&pretty, Commands::Remove { id: "alice".into() }).expect("remove");
    exec(&pretty, fact("alice", "knows", "bob")).expect("re-add");
    let graph = load_graph(&s).expect("load");

    let second = exec_json(&s, Commands::Hash);
    assert_eq!(
        second["checksum"],
        json!(format!("{:016x}", snapshot_checksum(&graph)))
    );
    assert_eq!(second["blake3"].as_str().map(str::len), Some(64));
    assert_eq!(first["entities"], second["entities"]);
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn config_file_feeds_settings() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("hkg.toml");
    std::fs::write(
        &path,
        "store = \"graph.json\"\npreserved = [\"bob\"]\npretty = false\n",
    )
    .expect("write config");

    let config = HkgConfig::discover(Some(&path)).expect("load config");
    assert_eq!(config.store, Path::new("graph.json"));
    let s = Settings::from_config(&config);
    assert_eq!(s.preserved, vec!["bob".to_string()]);
    assert!(!s.pretty);
    assert!(!s.json_mode);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = HkgConfig::discover(Some(&dir.path().join("absent.toml"))).expect_err("missing");
    assert!(matches!(err, HkError::ConfigError(_)));
}
