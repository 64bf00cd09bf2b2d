//! # CLI Command Implementations
//!
//! Each command loads the snapshot, works on an in-memory store and, when it
//! mutates, writes the snapshot back. Text output goes to `out`; diagnostics
//! go through `tracing`.

use super::Cli;
use crate::config::HkgConfig;
use hyperknowledge_core::{
    Built, Entity, EntityId, GraphBuilder, GraphMetrics, HkError, HyperGraph, Upsert,
    formats::snapshot, graph_from_json, primitives::MAX_SNAPSHOT_SIZE, snapshot_checksum,
    snapshot_crypto_hash,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

// =============================================================================
// SETTINGS
// =============================================================================

/// Resolved options shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store: PathBuf,
    pub pretty: bool,
    pub preserved: Vec<String>,
    pub json_mode: bool,
    pub quiet: bool,
}

impl Settings {
    /// Merge config values with command-line flags; flags win.
    pub fn new(cli: &Cli, config: &HkgConfig) -> Self {
        Self {
            store: config.store_path(cli.store.as_deref()),
            json_mode: cli.json_mode,
            quiet: cli.quiet,
            ..Self::from_config(config)
        }
    }

    pub fn from_config(config: &HkgConfig) -> Self {
        Self {
            store: config.store.clone(),
            pretty: config.pretty,
            preserved: config.preserved.clone(),
            json_mode: false,
            quiet: false,
        }
    }
}

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for `import` (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), HkError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| HkError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(HkError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, HkError> {
    let canonical = path.canonicalize().map_err(|e| {
        HkError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(HkError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write an empty store.
pub fn cmd_init(
    settings: &Settings,
    out: &mut impl std::io::Write,
    force: bool,
) -> Result<(), HkError> {
    if settings.store.exists() && !force {
        return Err(HkError::IoError(format!(
            "Store '{}' already exists. Use --force to overwrite.",
            settings.store.display()
        )));
    }

    save_graph(&HyperGraph::new(), settings)?;
    tracing::info!(store = %settings.store.display(), "Initialized store");

    if settings.json_mode {
        return emit_json(out, &json!({"store": settings.store.to_string_lossy(), "initialized": true}));
    }
    if settings.quiet {
        return Ok(());
    }
    emit(out, &format!("Initialized empty store at {}\n", settings.store.display()))
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show entity counts and index health.
pub fn cmd_status(settings: &Settings, out: &mut impl std::io::Write) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let metrics = GraphMetrics::from_graph(&graph);

    if settings.json_mode {
        let mut output = serde_json::to_value(&metrics)
            .map_err(|e| HkError::SerializationError(e.to_string()))?;
        if let Value::Object(map) = &mut output {
            map.insert("store".into(), json!(settings.store.to_string_lossy()));
            map.insert("settled".into(), json!(metrics.is_settled()));
        }
        return emit_json(out, &output);
    }

    let mut text = String::new();
    text.push_str("Hyperknowledge Store Status\n");
    text.push_str("===========================\n");
    text.push_str(&format!("Store:    {}\n", settings.store.display()));
    text.push('\n');
    text.push_str(&format!("Entities: {}\n", metrics.entity_count));
    for (kind, count) in &metrics.per_kind {
        text.push_str(&format!("  {:<16}{}\n", kind.as_str(), count));
    }
    text.push_str(&format!("Virtual:  {}\n", metrics.virtual_count));
    text.push_str(&format!("Orphans:  {}\n", metrics.orphan_count));
    text.push_str(&format!("Pending:  {}\n", metrics.pending_bind_count));
    text.push_str(&format!("Adjacent: {}\n", metrics.adjacency_count));
    emit(out, &text)
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Counts from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

/// Add or update entities read from `input`.
///
/// The file holds a JSON array of entities, a single entity, or a snapshot.
/// Rejected entities are logged and counted; the rest are still saved.
pub fn cmd_import(
    settings: &Settings,
    out: &mut impl std::io::Write,
    input: &Path,
) -> Result<(), HkError> {
    let input = validate_file_path(input)?;
    validate_file_size(&input, MAX_IMPORT_FILE_SIZE)?;

    let text = std::fs::read_to_string(&input)
        .map_err(|e| HkError::IoError(format!("Cannot read '{}': {}", input.display(), e)))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| HkError::DeserializationError(format!("Invalid JSON: {}", e)))?;
    let values = import_values(value)?;

    let mut graph = load_graph(settings)?;
    let report = import_into(&mut graph, &values);
    save_graph(&graph, settings)?;

    tracing::info!(
        inserted = report.inserted,
        updated = report.updated,
        rejected = report.rejected,
        "Import complete"
    );

    if settings.json_mode {
        return emit_json(
            out,
            &json!({
                "inserted": report.inserted,
                "updated": report.updated,
                "rejected": report.rejected,
            }),
        );
    }
    if settings.quiet {
        return Ok(());
    }
    emit(
        out,
        &format!(
            "Imported {} new, {} updated, {} rejected\n",
            report.inserted, report.updated, report.rejected
        ),
    )
}

/// Upsert every value into `graph`.
pub fn import_into(graph: &mut HyperGraph, values: &[Value]) -> ImportReport {
    let mut report = ImportReport::default();
    for result in graph.add_entities(values) {
        match result {
            Ok(Upsert::Inserted(_)) => report.inserted += 1,
            Ok(Upsert::Updated(_)) => report.updated += 1,
            Err(_) => report.rejected += 1,
        }
    }
    report
}

/// Flatten an import document into entity values.
fn import_values(value: Value) -> Result<Vec<Value>, HkError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) if map.contains_key("type") => Ok(vec![Value::Object(map)]),
        snapshot @ Value::Object(_) => {
            let graph = graph_from_json(&snapshot)?;
            Ok(graph.entities().map(Entity::to_json).collect())
        }
        _ => Err(HkError::DeserializationError(
            "Import file must hold an array, an entity or a snapshot".to_string(),
        )),
    }
}

// =============================================================================
// INSPECTION COMMANDS
// =============================================================================

/// Print an entity in wire form.
pub fn cmd_show(settings: &Settings, out: &mut impl std::io::Write, id: &str) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let id = EntityId::from(id);
    let entity = graph
        .get_entity(&id)
        .ok_or_else(|| HkError::EntityNotFound(id.clone()))?;
    emit_json(out, &entity.to_json())
}

/// List the children of `parent`, plus orphans waiting for it.
pub fn cmd_children(
    settings: &Settings,
    out: &mut impl std::io::Write,
    parent: Option<&str>,
) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let parent = parent.map(EntityId::from);
    let children = graph.get_children(parent.as_ref());
    let orphans = parent
        .as_ref()
        .map(|p| graph.get_orphans(p))
        .unwrap_or_default();

    if settings.json_mode {
        return emit_json(
            out,
            &json!({
                "parent": parent.as_ref().map(EntityId::as_str),
                "children": summaries(&children),
                "orphans": summaries(&orphans),
            }),
        );
    }

    let mut text = listing(&children);
    for orphan in &orphans {
        text.push_str(&format!("{}\t{}\t(orphan)\n", orphan.id(), orphan.kind()));
    }
    emit(out, &text)
}

/// List entities adjacent to `id` through links.
pub fn cmd_neighbors(
    settings: &Settings,
    out: &mut impl std::io::Write,
    id: &str,
) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let id = EntityId::from(id);
    if !graph.has_id(&id) {
        return Err(HkError::EntityNotFound(id));
    }
    let neighbors = graph.get_neighbors(&id);

    if settings.json_mode {
        return emit_json(out, &json!({"id": id.as_str(), "neighbors": summaries(&neighbors)}));
    }
    emit(out, &listing(&neighbors))
}

/// List the links of `connector` with their binds.
pub fn cmd_relations(
    settings: &Settings,
    out: &mut impl std::io::Write,
    connector: &str,
) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let connector = EntityId::from(connector);
    if !graph.has_id(&connector) {
        return Err(HkError::EntityNotFound(connector));
    }
    let links = graph.links_of(&connector);

    if settings.json_mode {
        let items: Vec<Value> = links
            .iter()
            .map(|link| json!({"id": link.id.as_str(), "binds": link.binds.to_json()}))
            .collect();
        return emit_json(out, &json!({"connector": connector.as_str(), "links": items}));
    }

    let mut text = String::new();
    for link in links {
        let roles: Vec<String> = link
            .binds
            .roles()
            .map(|role| {
                let components: Vec<&str> =
                    link.binds.components_of(role).map(EntityId::as_str).collect();
                format!("{}={}", role, components.join(","))
            })
            .collect();
        text.push_str(&format!("{}\t{}\n", link.id, roles.join(" ")));
    }
    emit(out, &text)
}

// =============================================================================
// MUTATING COMMANDS
// =============================================================================

/// Remove an entity and save.
pub fn cmd_remove(settings: &Settings, out: &mut impl std::io::Write, id: &str) -> Result<(), HkError> {
    let mut graph = load_graph(settings)?;
    let removed = graph.remove_entity(&EntityId::from(id))?;
    save_graph(&graph, settings)?;
    tracing::info!(id = %removed.id(), kind = %removed.kind(), "Removed entity");

    if settings.json_mode {
        return emit_json(out, &json!({"removed": removed.to_json()}));
    }
    if settings.quiet {
        return Ok(());
    }
    emit(out, &format!("Removed {} {}\n", removed.kind(), removed.id()))
}

/// Assert `subject predicate object`, creating what is missing.
///
/// Ids listed as preserved in the config are never created; binds to
/// them stay pending until they are added.
pub fn cmd_fact(
    settings: &Settings,
    out: &mut impl std::io::Write,
    subject: &str,
    predicate: &str,
    object: &str,
    parent: Option<&str>,
) -> Result<(), HkError> {
    let mut builder = GraphBuilder::from_graph(load_graph(settings)?);
    for id in &settings.preserved {
        builder.preserve(id.as_str());
    }

    let parent = parent.map(EntityId::from);
    let built = builder.add_fact(
        &EntityId::from(subject),
        &EntityId::from(predicate),
        &EntityId::from(object),
        parent.as_ref(),
    )?;
    // Subject and object nodes may be new even when the link is not.
    save_graph(builder.graph(), settings)?;

    let (status, id) = match &built {
        Built::Created(id) => ("created", id),
        Built::Existing(id) => ("existing", id),
        Built::Preserved(id) => ("preserved", id),
    };
    tracing::info!(link = %id, status, "Fact asserted");

    if settings.json_mode {
        return emit_json(out, &json!({"link": id.as_str(), "status": status}));
    }
    if settings.quiet {
        return Ok(());
    }
    emit(out, &format!("{} {}\n", status, id))
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the FNV-1a checksum and BLAKE3 hash of the store.
pub fn cmd_hash(settings: &Settings, out: &mut impl std::io::Write) -> Result<(), HkError> {
    let graph = load_graph(settings)?;
    let checksum = snapshot_checksum(&graph);
    let blake3 = snapshot_crypto_hash(&graph);

    if settings.json_mode {
        return emit_json(
            out,
            &json!({
                "checksum": format!("{:016x}", checksum),
                "blake3": blake3,
                "entities": graph.len(),
            }),
        );
    }
    emit(
        out,
        &format!("checksum: {:016x}\nblake3:   {}\n", checksum, blake3),
    )
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load the store, or start empty when the file does not exist yet.
pub fn load_graph(settings: &Settings) -> Result<HyperGraph, HkError> {
    if !settings.store.exists() {
        tracing::debug!(store = %settings.store.display(), "No store file, starting empty");
        return Ok(HyperGraph::new());
    }
    validate_file_size(&settings.store, MAX_SNAPSHOT_SIZE as u64)?;

    let text = std::fs::read_to_string(&settings.store).map_err(|e| {
        HkError::IoError(format!("Cannot read '{}': {}", settings.store.display(), e))
    })?;
    snapshot::from_str(&text)
}

pub fn save_graph(graph: &HyperGraph, settings: &Settings) -> Result<(), HkError> {
    let text = snapshot::to_string(graph, settings.pretty)?;
    std::fs::write(&settings.store, text).map_err(|e| {
        HkError::IoError(format!("Cannot write '{}': {}", settings.store.display(), e))
    })
}

fn summaries(entities: &[&Entity]) -> Vec<Value> {
    entities
        .iter()
        .map(|e| json!({"id": e.id().as_str(), "type": e.kind().as_str()}))
        .collect()
}

fn listing(entities: &[&Entity]) -> String {
    entities
        .iter()
        .map(|e| format!("{}\t{}\n", e.id(), e.kind()))
        .collect()
}

fn emit(out: &mut impl std::io::Write, text: &str) -> Result<(), HkError> {
    out.write_all(text.as_bytes())
        .map_err(|e| HkError::IoError(format!("Cannot write output: {}", e)))
}

fn emit_json(out: &mut impl std::io::Write, value: &Value) -> Result<(), HkError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| HkError::SerializationError(e.to_string()))?;
    emit(out, &format!("{}\n", text))
}
