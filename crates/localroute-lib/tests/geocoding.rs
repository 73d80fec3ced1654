mod common;

use common::gazetteer_fixture;
use localroute_lib::{normalize, GazetteerStore, GeocodingResolver, PlaceKind, ScoringConfig};

fn resolver_for(store: &GazetteerStore) -> GeocodingResolver<'_> {
    GeocodingResolver::new(store, ScoringConfig::default())
}

#[test]
fn normalization_is_idempotent_and_strips_accents() {
    for input in [
        "  Café   de  l'Opéra ",
        "123 MAIN St.",
        "Straße-Nord, #4",
        "",
        "?!",
    ] {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        assert!(!once.starts_with(' ') && !once.ends_with(' '));
    }
    assert_eq!(normalize("  Café   de  l'Opéra "), "cafe de lopera");
    assert_eq!(normalize("123 MAIN St."), "123 main st");
}

#[test]
fn fixture_loads_with_kinds_and_regions() {
    let store = GazetteerStore::load(&gazetteer_fixture()).expect("fixture loads");
    assert_eq!(store.len(), 6);
    let station = store.get("p-station").expect("station present");
    assert_eq!(station.kind, PlaceKind::Poi);
    assert_eq!(station.region.as_deref(), Some("Springfield"));
    let town = store.get("p-springfield").expect("locality present");
    assert_eq!(town.kind, PlaceKind::Locality);
    assert_eq!(town.region, None);
}

#[test]
fn exact_normalized_name_scores_one() {
    let store = GazetteerStore::load(&gazetteer_fixture()).expect("fixture loads");
    let resolver = resolver_for(&store);
    for record in store.iter() {
        let results = resolver.resolve(&record.raw_name, 10).expect("valid query");
        let hit = results
            .iter()
            .find(|candidate| candidate.place.id == record.id)
            .unwrap_or_else(|| panic!("{} not returned", record.raw_name));
        assert_eq!(hit.score, 1.0);
    }
}

#[test]
fn results_are_bounded_and_sorted() {
    let store = GazetteerStore::load(&gazetteer_fixture()).expect("fixture loads");
    let resolver = GeocodingResolver::new(
        &store,
        ScoringConfig {
            min_score: 0.0,
            ..ScoringConfig::default()
        },
    );
    for query in ["main", "st", "123 Main", "springfield", "oak ave 456"] {
        for limit in [1, 2, 5] {
            let results = resolver.resolve(query, limit).expect("valid query");
            assert!(results.len() <= limit, "{query} returned too many");
            for pair in results.windows(2) {
                assert!(pair[0].score >= pair[1].score, "{query} not sorted");
            }
        }
    }
}

#[test]
fn case_and_punctuation_do_not_matter() {
    let store = GazetteerStore::load(&gazetteer_fixture()).expect("fixture loads");
    let resolver = resolver_for(&store);
    let results = resolver.resolve("456, OAK   ave!", 1).expect("valid query");
    assert_eq!(results[0].place.id, "p-oak-456");
    assert_eq!(results[0].score, 1.0);
}

#[test]
fn lookups_by_token_and_prefix() {
    let store = GazetteerStore::load(&gazetteer_fixture()).expect("fixture loads");
    let main: Vec<&str> = store
        .lookup_token("main")
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(main, vec!["p-main-12", "p-main-123"]);
    assert!(store.lookup_prefix("sta").iter().any(|p| p.id == "p-station"));
    assert!(store.lookup_token("nowhere").is_empty());
}
