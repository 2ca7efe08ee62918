//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command opens the session, runs one unit of work and, for the file
//! backend, writes the snapshot back.

use super::{CliError, Context, GroupKey};
use crate::config::Backend;
use artgraph_core::{
    Artifact, ArtifactIdGroup, GroupRepository, Session, VertexId, formats::MAX_SNAPSHOT_PAYLOAD_SIZE,
};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// SESSION HELPERS
// =============================================================================

/// Open the configured backend. A missing snapshot file starts empty.
pub fn load_or_create_session(ctx: &Context) -> Result<Session, CliError> {
    match ctx.backend {
        Backend::Redb => Ok(Session::with_redb(&ctx.database)?),
        Backend::File => {
            if ctx.database.exists() {
                validate_file_size(&ctx.database, MAX_SNAPSHOT_PAYLOAD_SIZE as u64)?;
                Ok(Session::load_snapshot(&ctx.database)?)
            } else {
                Ok(Session::new())
            }
        }
    }
}

/// Persist the session if it lives in memory.
pub fn save_session(session: &Session, ctx: &Context) -> Result<(), CliError> {
    if session.is_persistent() {
        // Redb backend - already committed, nothing to do
        return Ok(());
    }
    session.save_snapshot(&ctx.database)?;
    Ok(())
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CliError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CliError::Io(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(CliError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn find_group(
    repo: &GroupRepository,
    session: &Session,
    key: &GroupKey,
) -> Result<ArtifactIdGroup, CliError> {
    repo.find(session, &key.storage, &key.repository, &key.name)?
        .ok_or_else(|| {
            CliError::NotFound(format!(
                "No group {}/{}/{}",
                key.storage, key.repository, key.name
            ))
        })
}

fn group_id(group: &ArtifactIdGroup) -> Result<VertexId, CliError> {
    group
        .id
        .ok_or_else(|| CliError::NotFound(format!("Group {} is not stored", group.name())))
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), CliError> {
    if ctx.database.exists() {
        if !force {
            return Err(CliError::Usage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| CliError::Io(format!("Remove existing database: {e}")))?;
    }

    match ctx.backend {
        Backend::Redb => {
            let _session = Session::with_redb(&ctx.database)?;
        }
        Backend::File => {
            Session::new().save_snapshot(&ctx.database)?;
        }
    }
    info!(database = %ctx.database.display(), backend = ctx.backend.as_str(), "initialized database");
    println!(
        "Initialized new {} database at {:?}",
        ctx.backend.as_str(),
        ctx.database
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph status.
pub fn cmd_status(ctx: &Context) -> Result<(), CliError> {
    let session = load_or_create_session(ctx)?;
    let vertices = session.vertex_count()?;
    let edges = session.edge_count()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": ctx.backend.as_str(),
            "vertex_count": vertices,
            "edge_count": edges,
        }));
        return Ok(());
    }

    println!("artgraph Status");
    println!("===============");
    println!("Database: {:?}", ctx.database);
    println!("Backend:  {}", ctx.backend.as_str());
    println!();
    println!("Vertices: {vertices}");
    println!("Edges:    {edges}");
    Ok(())
}

// =============================================================================
// REGISTER COMMAND
// =============================================================================

/// Add an artifact to a group, creating the group on first use.
///
/// A member with the same path is updated in place instead of duplicated.
pub fn cmd_register(
    ctx: &Context,
    key: &GroupKey,
    path: &str,
    size: Option<i64>,
    checksum: Option<String>,
) -> Result<(), CliError> {
    let mut session = load_or_create_session(ctx)?;
    let repo = GroupRepository::new()?;

    let mut group = repo
        .find(&session, &key.storage, &key.repository, &key.name)?
        .unwrap_or_else(|| ArtifactIdGroup::new(&key.storage, &key.repository, &key.name));

    let mut artifact = group
        .artifacts()
        .iter()
        .find(|a| a.path == path)
        .cloned()
        .unwrap_or_else(|| Artifact::new(&key.storage, &key.repository, path));
    if size.is_some() {
        artifact.size_bytes = size;
    }
    if checksum.is_some() {
        artifact.checksum = checksum;
    }
    let uuid = artifact.uuid();
    group.add_artifact(artifact);

    let id = repo.save(&mut session, &group)?;
    save_session(&session, ctx)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "group_id": id.0,
            "artifact_uuid": uuid.to_string(),
            "members": group.artifacts().len(),
        }));
    } else {
        println!("Registered {path} as {uuid} in group {id}");
    }
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print a group with its hydrated members.
pub fn cmd_show(ctx: &Context, key: &GroupKey) -> Result<(), CliError> {
    let session = load_or_create_session(ctx)?;
    let repo = GroupRepository::new()?;
    let group = find_group(&repo, &session, key)?;

    if ctx.json_mode {
        let value = serde_json::to_value(&group).map_err(|e| CliError::Io(e.to_string()))?;
        print_json(&value);
        return Ok(());
    }

    println!(
        "Group {}/{}/{} ({})",
        group.storage_id(),
        group.repository_id(),
        group.name(),
        group.uuid()
    );
    for artifact in group.artifacts() {
        let id = artifact.id.map(|id| id.to_string()).unwrap_or_default();
        println!(
            "  {id:<8} {} {} size={} checksum={}",
            artifact.uuid(),
            artifact.path,
            artifact
                .size_bytes
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            artifact.checksum.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

// =============================================================================
// PROXY COMMANDS
// =============================================================================

/// Create a remote proxy for a canonical artifact.
pub fn cmd_proxy(ctx: &Context, artifact: u64) -> Result<(), CliError> {
    let mut session = load_or_create_session(ctx)?;
    let proxy = session.create_remote_proxy(VertexId(artifact))?;
    save_session(&session, ctx)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "proxy_id": proxy.0, "canonical_id": artifact }));
    } else {
        println!("Created proxy {proxy} for {}", VertexId(artifact));
    }
    Ok(())
}

/// Attach a remote proxy to a group.
pub fn cmd_adopt(ctx: &Context, key: &GroupKey, proxy: u64) -> Result<(), CliError> {
    let mut session = load_or_create_session(ctx)?;
    let repo = GroupRepository::new()?;
    let group = group_id(&find_group(&repo, &session, key)?)?;

    repo.adopt(&mut session, group, VertexId(proxy))?;
    save_session(&session, ctx)?;
    println!("Group {group} now owns proxy {}", VertexId(proxy));
    Ok(())
}

// =============================================================================
// REMOVE / DELETE COMMANDS
// =============================================================================

/// Remove one member from a group. The artifact vertex stays in the graph.
pub fn cmd_remove(ctx: &Context, key: &GroupKey, uuid: &str) -> Result<(), CliError> {
    let uuid = Uuid::parse_str(uuid).map_err(|e| CliError::Usage(format!("Invalid uuid: {e}")))?;
    let mut session = load_or_create_session(ctx)?;
    let repo = GroupRepository::new()?;
    let mut group = find_group(&repo, &session, key)?;

    let removed = group
        .remove_artifact(uuid)
        .ok_or_else(|| CliError::NotFound(format!("No member {uuid} in {}", group.name())))?;
    repo.save(&mut session, &group)?;
    save_session(&session, ctx)?;

    debug!(member = %uuid, path = %removed.path, "member removed");
    println!("Removed {} from group {}", removed.path, group.name());
    Ok(())
}

/// Cascade-delete groups selected by id and/or natural key.
pub fn cmd_delete(
    ctx: &Context,
    group_ids: &[u64],
    key: Option<&GroupKey>,
) -> Result<(), CliError> {
    let mut session = load_or_create_session(ctx)?;
    let repo = GroupRepository::new()?;

    let mut targets: Vec<VertexId> = group_ids.iter().copied().map(VertexId).collect();
    if let Some(key) = key {
        targets.push(group_id(&find_group(&repo, &session, key)?)?);
    }
    targets.sort();
    targets.dedup();
    if targets.is_empty() {
        return Err(CliError::Usage(
            "Select groups with --group-id or --storage/--repository/--name".to_string(),
        ));
    }

    let report = repo.delete(&mut session, &targets)?;
    save_session(&session, ctx)?;

    if ctx.json_mode {
        let value = serde_json::to_value(report).map_err(|e| CliError::Io(e.to_string()))?;
        print_json(&value);
    } else {
        println!(
            "Deleted {} group(s): {} vertices, {} edges",
            report.groups, report.vertices, report.edges
        );
    }
    Ok(())
}
