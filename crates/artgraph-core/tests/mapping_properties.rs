//! # Mapping Property Tests
//!
//! Every property runs against both backends. If ANY property fails, the
//! mapping layer is INVALID.
//!
//! ## Properties
//! - Idempotent write
//! - Round-trip
//! - Indirection transparency
//! - Edge replacement
//! - Cascade closure
//! - Empty group

use artgraph_core::schema::{edges, vertices};
use artgraph_core::{
    Artifact, ArtifactIdGroup, Direction, Element, GroupRepository, OgmError, Session, VertexId,
};
use std::collections::BTreeSet;

/// Run `test` once on an in-memory session and once on a fresh redb file.
fn with_each_backend(test: impl Fn(&mut Session)) {
    test(&mut Session::new());

    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::with_redb(dir.path().join("graph.redb")).expect("open redb");
    test(&mut session);
}

fn repo() -> GroupRepository {
    GroupRepository::new().expect("adapters register")
}

fn group_of(name: &str, paths: &[&str]) -> ArtifactIdGroup {
    let mut group = ArtifactIdGroup::new("storage-a", "releases", name);
    for path in paths {
        group.add_artifact(Artifact::new("storage-a", "releases", *path));
    }
    group
}

/// Targets of the group's ownership edges.
fn owned(session: &Session, group: VertexId) -> BTreeSet<VertexId> {
    session
        .read(|g| g.edges(group, Direction::Out, Some(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS)))
        .expect("edges")
        .into_iter()
        .map(|e| e.to)
        .collect()
}

fn member_uuids(group: &ArtifactIdGroup) -> BTreeSet<uuid::Uuid> {
    group.artifacts().iter().map(Artifact::uuid).collect()
}

// =============================================================================
// IDEMPOTENT WRITE
// =============================================================================

mod idempotent_write {
    use super::*;

    /// Saving the same entity twice reuses every vertex.
    #[test]
    fn second_save_creates_nothing() {
        with_each_backend(|session| {
            let repo = repo();
            let group = group_of("commons", &["c-1.jar", "c-2.jar", "c-3.jar"]);

            let first = repo.save(session, &group).expect("first save");
            let after_first = owned(session, first);
            let second = repo.save(session, &group).expect("second save");

            assert_eq!(first, second);
            assert_eq!(session.vertex_count().expect("count"), 4);
            assert_eq!(owned(session, second), after_first);
            assert_eq!(session.edge_count().expect("count"), 3);
        });
    }

    /// A freshly built group with a stored natural key keeps the stored uuid.
    #[test]
    fn natural_key_save_keeps_external_identity() {
        with_each_backend(|session| {
            let repo = repo();
            let original = group_of("lib", &[]);
            let id = repo.save(session, &original).expect("first save");

            let rebuilt = group_of("lib", &["lib-1.0.jar"]);
            assert_ne!(rebuilt.uuid(), original.uuid());
            assert_eq!(repo.save(session, &rebuilt).expect("second save"), id);

            let loaded = repo.find_by_id(session, id).expect("find").expect("group");
            assert_eq!(loaded.uuid(), original.uuid());
            assert_eq!(member_uuids(&loaded), member_uuids(&rebuilt));
            assert_eq!(session.vertex_count().expect("count"), 2);
        });
    }

    /// Re-saving a loaded group (merge by id) is equally stable.
    #[test]
    fn resave_of_loaded_group_is_stable() {
        with_each_backend(|session| {
            let repo = repo();
            let id = repo
                .save(session, &group_of("commons", &["c-1.jar"]))
                .expect("save");
            let loaded = repo.find_by_id(session, id).expect("find").expect("group");

            assert_eq!(repo.save(session, &loaded).expect("resave"), id);
            assert_eq!(session.vertex_count().expect("count"), 2);
            assert_eq!(session.edge_count().expect("count"), 1);
        });
    }
}

// =============================================================================
// ROUND-TRIP
// =============================================================================

mod round_trip {
    use super::*;

    /// fold(unfold(G)) matches G on scalars and member uuids.
    #[test]
    fn fold_of_unfold_matches() {
        with_each_backend(|session| {
            let repo = repo();
            let mut group = group_of("lib", &["lib-1.0.jar", "lib-1.0.pom"]);
            group.add_artifact(
                Artifact::new("storage-a", "releases", "lib-1.0-sources.jar")
                    .with_size(4096)
                    .with_checksum("sha256:00ff"),
            );

            let id = repo.save(session, &group).expect("save");
            let loaded = repo.find_by_id(session, id).expect("find").expect("group");

            assert_eq!(loaded.id, Some(id));
            assert_eq!(loaded.uuid(), group.uuid());
            assert_eq!(loaded.storage_id(), group.storage_id());
            assert_eq!(loaded.repository_id(), group.repository_id());
            assert_eq!(loaded.name(), group.name());
            assert_eq!(member_uuids(&loaded), member_uuids(&group));

            let sources = group.artifacts()[2].uuid();
            let hydrated = loaded.artifact(sources).expect("sources member");
            assert_eq!(hydrated.size_bytes, Some(4096));
            assert_eq!(hydrated.checksum.as_deref(), Some("sha256:00ff"));
        });
    }
}

// =============================================================================
// INDIRECTION TRANSPARENCY
// =============================================================================

mod indirection_transparency {
    use super::*;

    /// A proxy member is hydrated from its canonical vertex.
    #[test]
    fn proxy_slot_reads_canonical_properties() {
        with_each_backend(|session| {
            let repo = repo();
            let local = group_of("lib", &["lib-2.0.jar"]);
            let canonical_uuid = local.artifacts()[0].uuid();
            let local_id = repo.save(session, &local).expect("save local");
            let canonical = repo
                .find_by_id(session, local_id)
                .expect("find")
                .expect("group")
                .artifacts()[0]
                .id
                .expect("canonical id");

            let proxy = session.create_remote_proxy(canonical).expect("proxy");
            let remote = repo
                .save(session, &ArtifactIdGroup::new("storage-a", "proxy-repo", "lib"))
                .expect("save remote");
            repo.adopt(session, remote, proxy).expect("adopt");

            let loaded = repo.find_by_id(session, remote).expect("find").expect("group");
            assert_eq!(loaded.artifacts().len(), 1);
            let member = &loaded.artifacts()[0];
            assert_eq!(member.uuid(), canonical_uuid);
            assert_eq!(member.path, "lib-2.0.jar");
            assert_eq!(member.id, Some(canonical));
        });
    }

    /// Re-saving a loaded group moves its proxy slot onto the canonical vertex.
    #[test]
    fn resave_moves_ownership_from_proxy_to_canonical() {
        with_each_backend(|session| {
            let repo = repo();
            let home = repo
                .save(session, &group_of("lib-home", &["lib-2.0.jar"]))
                .expect("save home");
            let canonical = repo
                .find_by_id(session, home)
                .expect("find")
                .expect("home")
                .artifacts()[0]
                .id
                .expect("canonical id");

            let mirror = repo
                .save(session, &group_of("lib-mirror", &["local.jar"]))
                .expect("save mirror");
            let proxy = session.create_remote_proxy(canonical).expect("proxy");
            repo.adopt(session, mirror, proxy).expect("adopt");
            let local = owned(session, mirror)
                .into_iter()
                .find(|&v| v != proxy)
                .expect("local member");
            assert_eq!(owned(session, mirror), BTreeSet::from([local, proxy]));

            let loaded = repo.find_by_id(session, mirror).expect("find").expect("mirror");
            repo.save(session, &loaded).expect("resave");

            assert_eq!(owned(session, mirror), BTreeSet::from([local, canonical]));
            assert_eq!(owned(session, home), BTreeSet::from([canonical]));

            // The proxy survives, still pointing at the canonical artifact.
            let inherit = session
                .read(|g| {
                    g.edges(
                        proxy,
                        Direction::Out,
                        Some(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT),
                    )
                })
                .expect("edges");
            assert_eq!(inherit.len(), 1);
            assert_eq!(inherit[0].to, canonical);

            let reloaded = repo.find_by_id(session, mirror).expect("find").expect("mirror");
            assert_eq!(member_uuids(&reloaded), member_uuids(&loaded));
        });
    }

    /// A proxy without its indirection edge is a schema-integrity failure.
    #[test]
    fn dangling_proxy_fails_to_fold() {
        with_each_backend(|session| {
            let repo = repo();
            let remote = repo
                .save(session, &ArtifactIdGroup::new("storage-a", "proxy-repo", "lib"))
                .expect("save");
            let proxy = session
                .transaction(|g| g.add_vertex(&vertices::REMOTE_ARTIFACT))
                .expect("proxy");
            repo.adopt(session, remote, proxy).expect("adopt");

            let result = repo.find_by_id(session, remote);
            assert!(matches!(result, Err(OgmError::SchemaIntegrity { .. })));
        });
    }
}

// =============================================================================
// EDGE REPLACEMENT
// =============================================================================

mod edge_replacement {
    use super::*;

    /// {A, B} re-saved as {A, C} leaves edges to A and C only.
    #[test]
    fn removed_member_loses_its_edge_but_keeps_its_vertex() {
        with_each_backend(|session| {
            let repo = repo();
            let mut group = group_of("lib", &["a.jar", "b.jar"]);
            let a = group.artifacts()[0].uuid();
            let b = group.artifacts()[1].uuid();
            let id = repo.save(session, &group).expect("save");
            let stored = repo.find_by_id(session, id).expect("find").expect("group");
            let b_vertex = stored.artifact(b).and_then(|m| m.id).expect("b id");

            group.remove_artifact(b).expect("b present");
            group.add_artifact(Artifact::new("storage-a", "releases", "c.jar"));
            repo.save(session, &group).expect("resave");

            let loaded = repo.find_by_id(session, id).expect("find").expect("group");
            let paths: BTreeSet<_> = loaded.artifacts().iter().map(|m| m.path.as_str()).collect();
            assert_eq!(paths, BTreeSet::from(["a.jar", "c.jar"]));
            assert!(loaded.artifact(a).is_some());

            assert_eq!(owned(session, id).len(), 2);
            assert!(!owned(session, id).contains(&b_vertex));
            assert!(
                session
                    .read(|g| g.contains_vertex(b_vertex))
                    .expect("contains")
            );
        });
    }
}

// =============================================================================
// CASCADE CLOSURE
// =============================================================================

mod cascade_closure {
    use super::*;

    /// Saves a group owning `a.jar` plus a proxy of a canonical artifact
    /// owned elsewhere. Returns (group, a, canonical).
    fn group_with_proxy(session: &mut Session, repo: &GroupRepository, name: &str) -> (VertexId, VertexId, VertexId) {
        let home = repo
            .save(session, &group_of(&format!("{name}-home"), &["d.jar"]))
            .expect("save home");
        let canonical = repo
            .find_by_id(session, home)
            .expect("find")
            .expect("home")
            .artifacts()[0]
            .id
            .expect("d id");

        let group = repo
            .save(session, &group_of(name, &["a.jar"]))
            .expect("save group");
        let a = repo
            .find_by_id(session, group)
            .expect("find")
            .expect("group")
            .artifacts()[0]
            .id
            .expect("a id");

        let proxy = session.create_remote_proxy(canonical).expect("proxy");
        repo.adopt(session, group, proxy).expect("adopt");
        (group, a, canonical)
    }

    /// {A, B -> D} cascades to exactly {group, A, D}.
    #[test]
    fn proxy_member_resolves_to_canonical() {
        with_each_backend(|session| {
            let repo = repo();
            let (group, a, d) = group_with_proxy(session, &repo, "lib");

            let closure = repo.cascade(session, &[group]).expect("cascade");
            assert_eq!(
                closure,
                BTreeSet::from([Element::Vertex(group), Element::Vertex(a), Element::Vertex(d)])
            );
        });
    }

    /// Cascade alone deletes nothing.
    #[test]
    fn cascade_does_not_mutate() {
        with_each_backend(|session| {
            let repo = repo();
            let (group, _, _) = group_with_proxy(session, &repo, "lib");
            let vertices = session.vertex_count().expect("count");
            let edges = session.edge_count().expect("count");

            repo.cascade(session, &[group]).expect("cascade");
            assert_eq!(session.vertex_count().expect("count"), vertices);
            assert_eq!(session.edge_count().expect("count"), edges);
        });
    }

    /// Two groups sharing a canonical artifact delete it once.
    #[test]
    fn batched_cascade_deduplicates_shared_canonical() {
        with_each_backend(|session| {
            let repo = repo();
            let home = repo
                .save(session, &group_of("home", &["shared.jar"]))
                .expect("save home");
            let shared = repo
                .find_by_id(session, home)
                .expect("find")
                .expect("home")
                .artifacts()[0]
                .id
                .expect("shared id");

            let mut groups = Vec::new();
            for name in ["left", "right"] {
                let id = repo
                    .save(session, &ArtifactIdGroup::new("storage-a", "proxy-repo", name))
                    .expect("save");
                let proxy = session.create_remote_proxy(shared).expect("proxy");
                repo.adopt(session, id, proxy).expect("adopt");
                groups.push(id);
            }

            let closure = repo.cascade(session, &groups).expect("cascade");
            assert_eq!(closure.len(), 3);
            assert!(closure.contains(&Element::Vertex(shared)));

            let report = repo.delete(session, &groups).expect("delete");
            assert_eq!(report.groups, 2);
            assert_eq!(report.vertices, 3);
            assert!(
                !session
                    .read(|g| g.contains_vertex(shared))
                    .expect("contains")
            );
            // home group and the two proxies stay; deleting them is not the
            // cascade's call.
            assert_eq!(session.vertex_count().expect("count"), 3);
        });
    }
}

// =============================================================================
// EMPTY GROUP
// =============================================================================

mod empty_group {
    use super::*;

    /// An empty group stores one vertex and no ownership edges.
    #[test]
    fn empty_group_is_a_lone_vertex() {
        with_each_backend(|session| {
            let repo = repo();
            let id = repo
                .save(session, &group_of("empty", &[]))
                .expect("save");

            assert_eq!(session.vertex_count().expect("count"), 1);
            assert!(owned(session, id).is_empty());
            let loaded = repo.find_by_id(session, id).expect("find").expect("group");
            assert!(loaded.artifacts().is_empty());
        });
    }

    /// Emptying a stored group drops every ownership edge.
    #[test]
    fn emptying_a_group_drops_its_edges() {
        with_each_backend(|session| {
            let repo = repo();
            let id = repo
                .save(session, &group_of("lib", &["a.jar", "b.jar"]))
                .expect("save");
            let mut loaded = repo.find_by_id(session, id).expect("find").expect("group");
            for uuid in member_uuids(&loaded) {
                loaded.remove_artifact(uuid);
            }
            repo.save(session, &loaded).expect("resave");

            assert!(owned(session, id).is_empty());
            assert_eq!(session.vertex_count().expect("count"), 3);
        });
    }
}

// =============================================================================
// ATOMICITY
// =============================================================================

mod atomicity {
    use super::*;

    /// A failing group merge rolls back the members written before it.
    #[test]
    fn failed_unfold_writes_nothing() {
        with_each_backend(|session| {
            let repo = repo();
            let mut group = group_of("lib", &["a.jar", "b.jar"]);
            group.id = Some(VertexId(9_999));

            let result = repo.save(session, &group);
            assert!(matches!(result, Err(OgmError::VertexNotFound(_))));
            assert_eq!(session.vertex_count().expect("count"), 0);
            assert_eq!(session.edge_count().expect("count"), 0);
        });
    }
}
