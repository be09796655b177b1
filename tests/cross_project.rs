mod common;

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use common::*;
use waypost::checker::{OccurrenceKind, Snapshot};
use waypost::config::{Config, MonikerMode};
use waypost::graph::{Edge, ItemProperty, MonikerKind, Payload, Vertex};
use waypost::report::{InternalSymbol, Reporter};

/// Two workspace packages on disk: libA exporting Foo, appB importing it.
fn cross_project_workspace() -> (tempfile::TempDir, Snapshot) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("libA")).unwrap();
    fs::create_dir_all(dir.path().join("appB")).unwrap();
    fs::write(
        dir.path().join("libA/package.json"),
        r#"{ "name": "libA", "version": "1.0.0", "main": "index.js" }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("appB/package.json"),
        r#"{ "name": "appB", "version": "1.0.0", "dependencies": { "libA": "1.0.0" } }"#,
    )
    .unwrap();

    let mut foo = declared(symbol("Foo"), 0, span(0, 13, 16));
    foo.exported = true;
    let mut lib_a = project("libA", "libA", &[0], &[]);
    lib_a.manifest = Some("libA/package.json".into());
    let mut app_b = project("appB", "appB", &[1], &["libA"]);
    app_b.manifest = Some("appB/package.json".into());

    let snapshot = Snapshot::new(
        "typescript",
        vec![app_b, lib_a],
        vec![
            document(
                "libA/index.ts",
                vec![occurrence(0, OccurrenceKind::Definition, span(0, 13, 16))],
            ),
            document(
                "appB/main.ts",
                vec![occurrence(0, OccurrenceKind::Reference, span(1, 8, 11))],
            ),
        ],
        vec![foo],
        Vec::new(),
    )
    .unwrap();
    (dir, snapshot)
}

#[test]
fn test_moniker_round_trip_shares_one_reference_result() {
    let (dir, snapshot) = cross_project_workspace();
    let config = Config {
        workspace_root: dir.path().to_path_buf(),
        ..Config::default()
    };
    let entries = run(&snapshot, &config);

    // The exporting and importing sides agree on the identifier, with their
    // respective kinds.
    let monikers: Vec<(String, MonikerKind)> = entries
        .iter()
        .filter_map(|entry| match &entry.payload {
            Payload::Vertex(Vertex::Moniker {
                identifier, kind, ..
            }) => Some((identifier.clone(), *kind)),
            _ => None,
        })
        .collect();
    assert!(monikers.contains(&("libA:index:Foo".to_string(), MonikerKind::Export)));
    assert!(monikers.contains(&("libA:index:Foo".to_string(), MonikerKind::Import)));

    // One shared result set and one shared reference result.
    assert_eq!(vertices(&entries, "resultSet").len(), 1);
    assert_eq!(vertices(&entries, "referenceResult").len(), 1);

    // appB's reference appears as an item scoped to appB's document.
    let app_doc = document_id(&entries, "appB/main.ts");
    let app_items: Vec<_> = edges(&entries, "item")
        .into_iter()
        .filter(|edge| edge.shard() == Some(&app_doc))
        .collect();
    assert_eq!(app_items.len(), 1);
    assert!(matches!(
        app_items[0],
        Edge::Item {
            property: Some(ItemProperty::References),
            ..
        }
    ));
}

#[test]
fn test_projects_are_indexed_in_topological_order() {
    let (dir, snapshot) = cross_project_workspace();
    let config = Config {
        workspace_root: dir.path().to_path_buf(),
        ..Config::default()
    };
    let entries = run(&snapshot, &config);

    // libA is listed second in the snapshot but must be indexed first.
    let names: Vec<String> = entries
        .iter()
        .filter_map(|entry| match &entry.payload {
            Payload::Vertex(Vertex::Project { name, .. }) => name.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["libA".to_string(), "appB".to_string()]);
}

#[test]
fn test_package_information_deduplicated_across_projects() {
    let (dir, snapshot) = cross_project_workspace();
    let config = Config {
        workspace_root: dir.path().to_path_buf(),
        ..Config::default()
    };
    let entries = run(&snapshot, &config);

    // Export and import monikers of Foo both belong to libA's package
    // record; it is emitted once.
    let packages: Vec<_> = entries
        .iter()
        .filter(|entry| {
            matches!(
                &entry.payload,
                Payload::Vertex(Vertex::PackageInformation { name, .. }) if name == "libA"
            )
        })
        .collect();
    assert_eq!(packages.len(), 1);
    assert_eq!(edges(&entries, "packageInformation").len(), 2);
}

#[test]
fn test_project_cycle_is_fatal() {
    let a = project("a", "a", &[], &["b"]);
    let b = project("b", "b", &[], &["a"]);
    let snapshot = Snapshot::new("typescript", vec![a, b], Vec::new(), Vec::new(), Vec::new())
        .unwrap();

    let sink = SharedSink::default();
    let emitter = Box::new(waypost::emit::LineEmitter::new(Box::new(sink.clone())));
    let config = Config::default();
    let result = waypost::driver::Driver::new(
        &snapshot,
        &config,
        Box::new(waypost::report::NullReporter),
    )
    .run(emitter);
    match result {
        Err(waypost::error::WaypostError::ProjectCycle(members)) => {
            assert!(members.contains('a') && members.contains('b'));
        }
        other => panic!("expected a project cycle error, got {other:?}"),
    }
}

#[test]
fn test_no_project_references_uses_declaration_order() {
    let (dir, snapshot) = cross_project_workspace();
    let config = Config {
        workspace_root: dir.path().to_path_buf(),
        no_project_references: true,
        ..Config::default()
    };
    let entries = run(&snapshot, &config);
    let names: Vec<String> = entries
        .iter()
        .filter_map(|entry| match &entry.payload {
            Payload::Vertex(Vertex::Project { name, .. }) => name.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["appB".to_string(), "libA".to_string()]);
}

#[test]
fn test_shared_document_walked_once() {
    // shared.ts belongs to both projects; the dependent project indexed
    // first consumes it, the second covers it through the shared records.
    let shared = declared(symbol("shared"), 0, span(0, 6, 12));
    let lib = project("lib", ".", &[0], &[]);
    let app = project("app", ".", &[0, 1], &["lib"]);
    let snapshot = Snapshot::new(
        "typescript",
        vec![app, lib],
        vec![
            document(
                "shared.ts",
                vec![occurrence(0, OccurrenceKind::Definition, span(0, 6, 12))],
            ),
            document(
                "main.ts",
                vec![occurrence(0, OccurrenceKind::Reference, span(0, 0, 6))],
            ),
        ],
        vec![shared],
        Vec::new(),
    )
    .unwrap();
    let entries = run(&snapshot, &Config::default());

    assert_eq!(vertices(&entries, "document").len(), 2);
    let end_events = entries
        .iter()
        .filter(|entry| {
            matches!(
                &entry.payload,
                Payload::Vertex(Vertex::Event {
                    kind: waypost::graph::EventKind::End,
                    scope: waypost::graph::EventScope::Document,
                    ..
                })
            )
        })
        .count();
    assert_eq!(end_events, 2);
}

#[derive(Default, Clone)]
struct CollectingReporter {
    internal: Rc<RefCell<Vec<InternalSymbol>>>,
}

impl Reporter for CollectingReporter {
    fn report_internal_symbol(&mut self, symbol: &InternalSymbol) {
        self.internal.borrow_mut().push(symbol.clone());
    }
}

#[test]
fn test_strict_mode_reports_internal_symbol_referenced_externally() {
    // f is local to a.ts but used from b.ts.
    let f = declared(symbol("f"), 0, span(0, 9, 10));
    let snapshot = Snapshot::new(
        "typescript",
        vec![project("main", ".", &[0, 1], &[])],
        vec![
            document(
                "a.ts",
                vec![occurrence(0, OccurrenceKind::Definition, span(0, 9, 10))],
            ),
            document(
                "b.ts",
                vec![occurrence(0, OccurrenceKind::Reference, span(0, 0, 1))],
            ),
        ],
        vec![f],
        Vec::new(),
    )
    .unwrap();

    let reporter = CollectingReporter::default();
    let events = reporter.internal.clone();
    let config = Config {
        moniker: MonikerMode::Strict,
        ..Config::default()
    };
    let entries = run_with_reporter(&snapshot, &config, Box::new(reporter));

    let reported = events.borrow();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].name, "f");
    assert!(reported[0].reference.ends_with("b.ts"));
    assert_eq!(reported[0].declarations.len(), 1);

    // The reference range is still emitted and linked.
    let b_doc = document_id(&entries, "b.ts");
    let contains = edges(&entries, "contains");
    let b_ranges = contains
        .iter()
        .find(|edge| *edge.out_v() == b_doc)
        .expect("b.ts contains edge");
    assert_eq!(b_ranges.in_vs().len(), 1);

    // And the fallback local moniker is attached.
    let locals = entries
        .iter()
        .filter(|entry| {
            matches!(
                &entry.payload,
                Payload::Vertex(Vertex::Moniker {
                    kind: MonikerKind::Local,
                    ..
                })
            )
        })
        .count();
    assert_eq!(locals, 1);
}

#[test]
fn test_lenient_mode_stays_silent() {
    let f = declared(symbol("f"), 0, span(0, 9, 10));
    let snapshot = Snapshot::new(
        "typescript",
        vec![project("main", ".", &[0, 1], &[])],
        vec![
            document(
                "a.ts",
                vec![occurrence(0, OccurrenceKind::Definition, span(0, 9, 10))],
            ),
            document(
                "b.ts",
                vec![occurrence(0, OccurrenceKind::Reference, span(0, 0, 1))],
            ),
        ],
        vec![f],
        Vec::new(),
    )
    .unwrap();

    let reporter = CollectingReporter::default();
    let events = reporter.internal.clone();
    let entries = run_with_reporter(&snapshot, &Config::default(), Box::new(reporter));

    assert!(events.borrow().is_empty());
    // In keep mode the record survives until project close, so both
    // occurrences share one result set.
    assert_eq!(vertices(&entries, "resultSet").len(), 1);
}
