//! End-to-end resolution passes over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use restaurant_resolver::{
    InMemoryStores, InspectionPayload, PassReport, RecordStore, ResolvePayload, ResolverConfig,
    ResolverEngine, RestaurantId,
};

struct Row<'a> {
    inspection: &'a str,
    name: &'a str,
    city: &'a str,
    state: &'a str,
    zip: Option<&'a str>,
}

fn row<'a>(inspection: &'a str, name: &'a str, state: &'a str, zip: &'a str) -> Row<'a> {
    Row {
        inspection,
        name,
        city: "Chicago",
        state,
        zip: Some(zip),
    }
}

fn load(engine: &ResolverEngine, rows: &[Row<'_>]) -> Vec<RestaurantId> {
    rows.iter()
        .map(|r| {
            engine
                .load_inspection(&InspectionPayload {
                    inspection_id: Some(r.inspection.to_string()),
                    name: Some(r.name.to_string()),
                    address: Some(format!("{} address", r.inspection)),
                    city: Some(r.city.to_string()),
                    state: Some(r.state.to_string()),
                    zip: r.zip.map(str::to_string),
                    ..InspectionPayload::default()
                })
                .unwrap()
                .restaurant_id
        })
        .collect()
}

fn engine_with_workers(workers: usize) -> ResolverEngine {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryStores::new());
    ResolverEngine::with_config(store, ResolverConfig::default().with_linkage_workers(workers))
        .unwrap()
}

fn absorbed_sets(report: &PassReport) -> Vec<Vec<RestaurantId>> {
    report.merged.iter().map(|m| m.absorbed.clone()).collect()
}

fn assert_link_integrity(engine: &ResolverEngine) {
    let store = engine.store();
    let links = store.find_links().unwrap();

    let mut originals = HashSet::new();
    for link in &links {
        assert!(originals.insert(link.original), "{} linked twice", link.original);

        let primary = store.get_restaurant(link.primary).unwrap().unwrap();
        assert!(primary.resolved);
        assert_eq!(store.find_primary(link.primary).unwrap(), None);

        let original = store.get_restaurant(link.original).unwrap().unwrap();
        assert!(original.resolved);
        assert!(store
            .find_inspections_by_restaurant(link.original)
            .unwrap()
            .is_empty());
    }
}

#[test]
fn kims_diner_variants_merge_into_one_composite() {
    let engine = ResolverEngine::in_memory();
    let ids = load(
        &engine,
        &[
            row("1", "Kim's Diner", "IL", "60601"),
            row("2", "Kims Diner", "IL", "60601"),
            row("3", "Alinea", "IL", "60614"),
        ],
    );

    let report = engine.resolve(ResolvePayload::unblocked()).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.merged[0].absorbed, vec![ids[0], ids[1]]);
    assert_eq!(report.singletons, vec![ids[2]]);

    let composite = engine.restaurant(report.merged[0].composite).unwrap();
    assert_eq!(composite.restaurant.name, "Kim's Diner");
    assert!(composite.restaurant.resolved);
    assert_eq!(composite.inspections.len(), 2);
    assert_eq!(engine.store().count_restaurants().unwrap(), 4);
    assert_link_integrity(&engine);
}

#[test]
fn same_name_in_different_states_does_not_merge() {
    let engine = ResolverEngine::in_memory();
    let ids = load(
        &engine,
        &[
            row("1", "Kim's Diner", "IL", "60601"),
            row("2", "Kim's Diner", "CA", "60601"),
        ],
    );

    for payload in [ResolvePayload::unblocked(), ResolvePayload::blocked(4)] {
        let report = engine.resolve(payload).unwrap();
        assert!(report.merged.is_empty());
    }
    assert!(engine.store().find_links().unwrap().is_empty());
    for id in ids {
        assert!(engine.store().get_restaurant(id).unwrap().unwrap().resolved);
    }
}

#[test]
fn second_pass_changes_nothing() {
    let engine = ResolverEngine::in_memory();
    load(
        &engine,
        &[
            row("1", "Kim's Diner", "IL", "60601"),
            row("2", "Kims Diner", "IL", "60601"),
            row("3", "Mario's Pizza", "IL", "60602"),
        ],
    );

    let first = engine.resolve(ResolvePayload::blocked(4)).unwrap();
    assert_eq!(first.group_count(), 2);
    let restaurants = engine.store().count_restaurants().unwrap();
    let links = engine.store().find_links().unwrap();

    for payload in [ResolvePayload::blocked(4), ResolvePayload::unblocked()] {
        let again = engine.resolve(payload).unwrap();
        assert_eq!(again.group_count(), 0);
    }
    assert_eq!(engine.store().count_restaurants().unwrap(), restaurants);
    assert_eq!(engine.store().find_links().unwrap(), links);
}

#[test]
fn new_rows_after_a_pass_resolve_incrementally() {
    let engine = ResolverEngine::in_memory();
    load(&engine, &[row("1", "Kim's Diner", "IL", "60601")]);
    engine.resolve(ResolvePayload::unblocked()).unwrap();

    let ids = load(
        &engine,
        &[
            row("2", "Kims Diner", "IL", "60601"),
            row("3", "Kims Diner.", "IL", "60601"),
        ],
    );
    let report = engine.resolve(ResolvePayload::unblocked()).unwrap();

    // Resolved rows are never candidates, so only the new rows merge.
    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.merged[0].absorbed, ids);
    assert_link_integrity(&engine);
}

#[test]
fn seven_eleven_merges_in_the_digit_block() {
    let engine = ResolverEngine::in_memory();
    let ids = load(
        &engine,
        &[
            row("1", "7-Eleven", "IL", "60610"),
            row("2", "7 Eleven", "IL", "60610"),
            row("3", "Subway", "IL", "60610"),
        ],
    );

    let report = engine.resolve(ResolvePayload::blocked(4)).unwrap();

    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.merged[0].block.as_deref(), Some("b4[1-9]"));
    assert_eq!(report.merged[0].absorbed, vec![ids[0], ids[1]]);
    let digit_block = report.blocks.iter().find(|b| b.label == "b4[1-9]").unwrap();
    assert_eq!(digit_block.rows, 2);
    assert_eq!(digit_block.merged, 1);
    assert_link_integrity(&engine);
}

#[test]
fn blocked_pass_only_compares_within_postal_prefix() {
    let engine = ResolverEngine::in_memory();
    load(
        &engine,
        &[
            row("1", "Kim's Diner", "IL", "60601"),
            row("2", "Kims Diner", "IL", "60657"),
        ],
    );

    let report = engine.resolve(ResolvePayload::blocked(4)).unwrap();
    assert!(report.merged.is_empty());
    assert_eq!(report.singletons.len(), 2);
}

#[test]
fn rows_without_postal_code_stay_apart_in_blocked_mode() {
    let engine = ResolverEngine::in_memory();
    let rows = [
        Row {
            inspection: "1",
            name: "Kim's Diner",
            city: "Chicago",
            state: "IL",
            zip: None,
        },
        Row {
            inspection: "2",
            name: "Kims Diner",
            city: "Chicago",
            state: "IL",
            zip: None,
        },
    ];
    load(&engine, &rows);

    let report = engine.resolve(ResolvePayload::blocked(4)).unwrap();
    assert!(report.merged.is_empty());
}

#[test]
fn parallel_linkage_produces_the_same_pass() {
    let rows = [
        row("1", "Kim's Diner", "IL", "60601"),
        row("2", "Kims Diner", "IL", "60601"),
        row("3", "Subway", "IL", "60610"),
        row("4", "Subway.", "IL", "60610"),
        row("5", "7-Eleven", "IL", "60610"),
        row("6", "7 Eleven", "IL", "60610"),
        row("7", "Mario's Pizza", "IL", "60602"),
        row("8", "#1 Noodle", "IL", "60602"),
        row("9", "#1 Noodles", "IL", "60602"),
    ];

    let sequential = engine_with_workers(1);
    load(&sequential, &rows);
    let parallel = engine_with_workers(4);
    load(&parallel, &rows);

    let a = sequential.resolve(ResolvePayload::blocked(4)).unwrap();
    let b = parallel.resolve(ResolvePayload::blocked(4)).unwrap();

    assert_eq!(absorbed_sets(&a), absorbed_sets(&b));
    assert_eq!(a.composites(), b.composites());
    assert_eq!(a.singletons, b.singletons);
    assert_eq!(a.blocks, b.blocks);
    assert_eq!(a.merged.len(), 4);
    assert!(a.merged.iter().any(|m| m.block.as_deref() == Some("b5[residual]")));
}
