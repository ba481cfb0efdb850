//! Property-Based Tests for the Cache-Aside Team Cache
//!
//! **Property 1: Cache-aside correctness.** After a ranked read populates an
//! empty cache, a second ranked read returns the same ranking without
//! touching the source-of-record.
//!
//! **Property 2: Top slice.** The top read returns `min(5, n)` teams, highest
//! wins first, all drawn from the source.
//!
//! **Property 3: Idempotent invalidation.** Invalidating twice leaves the
//! store as invalidating once; the second call removes nothing.
//!
//! **Property 4: Keyed completeness.** After a keyed read populates the
//! cache, every team is retrievable under its own key and no other team key
//! exists.
//!
//! **Property 5: Stampede safety.** Two concurrent ranked reads on an empty
//! cache may both load the source, but the sorted set ends up with one
//! member per team.
//!
//! **Property 6: Mutation then invalidation.** After the source changes and
//! the cache is invalidated, every strategy reflects the new wins.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use teamstats_core::{Team, TeamId};
use teamstats_storage::{
    CacheConfig, CacheStore, InMemoryStore, ReadStrategy, TeamCache, TeamSource, SORTED_SET_KEY, TOP_N,
};
use teamstats_test_utils::assertions::{assert_not_found, assert_ranked, assert_store_unavailable};
use teamstats_test_utils::fixtures::{
    counting_cache, counting_cache_with, league, league_ranked_wins, sorted_ids, team, wins,
};
use teamstats_test_utils::generators::{arb_league, arb_nonempty_league};
use teamstats_test_utils::CountingSource;
use tokio::runtime::Runtime;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

// ============================================================================
// PROPERTY 1: CACHE-ASIDE CORRECTNESS
// ============================================================================

#[tokio::test]
async fn test_second_ranked_read_skips_source() {
    let cache = counting_cache(league());

    let first = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert_eq!(cache.source().loads(), 1);
    assert!(!first.was_cache_hit());

    let second = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert_eq!(cache.source().loads(), 1);
    assert!(second.was_cache_hit());
    assert_eq!(wins(second.records()), league_ranked_wins());
    assert_eq!(second.records(), first.records());
}

#[tokio::test]
async fn test_direct_reads_always_load() {
    let cache = counting_cache(league());
    for _ in 0..3 {
        cache.read(ReadStrategy::Direct).await.unwrap();
    }
    assert_eq!(cache.source().loads(), 3);
    assert_eq!(cache.store().key_count(), 0);
}

#[tokio::test]
async fn test_unknown_selector_reads_directly() {
    let cache = counting_cache(league());
    let outcome = cache
        .read(ReadStrategy::from_selector("teamsByColour"))
        .await
        .unwrap();

    assert_eq!(wins(outcome.records()), league_ranked_wins());
    assert_eq!(cache.store().key_count(), 0);
}

#[tokio::test]
async fn test_empty_source_keeps_missing() {
    let cache = counting_cache(Vec::new());

    let first = cache.read(ReadStrategy::RankedSet).await.unwrap();
    let second = cache.read(ReadStrategy::RankedSet).await.unwrap();

    assert!(first.records().is_empty());
    assert!(!second.was_cache_hit());
    assert_eq!(cache.source().loads(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_ranked_hit_never_loads(teams in arb_nonempty_league(24)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = counting_cache(teams.clone());
            let miss = cache.read(ReadStrategy::RankedSet).await.unwrap();
            let hit = cache.read(ReadStrategy::RankedSet).await.unwrap();

            prop_assert_eq!(cache.source().loads(), 1);
            prop_assert!(hit.was_cache_hit());
            prop_assert_eq!(wins(hit.records()), wins(miss.records()));
            prop_assert_eq!(sorted_ids(hit.records()), sorted_ids(&teams));
            Ok(())
        })?;
    }
}

// ============================================================================
// PROPERTY 2: TOP SLICE
// ============================================================================

#[tokio::test]
async fn test_top_slice_of_league() {
    let cache = counting_cache(league());
    let top = cache.read(ReadStrategy::RankedTop).await.unwrap();

    assert_eq!(wins(top.records()), &league_ranked_wins()[..TOP_N]);
    assert_eq!(cache.store().sorted_set_len(SORTED_SET_KEY), league().len());
}

#[tokio::test]
async fn test_top_slice_after_full_read_skips_source() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::RankedSet).await.unwrap();
    let top = cache.read(ReadStrategy::RankedTop).await.unwrap();

    assert!(top.was_cache_hit());
    assert_eq!(cache.source().loads(), 1);
}

#[tokio::test]
async fn test_configured_top_size() {
    let cache = counting_cache_with(
        CountingSource::with_teams(league()),
        CacheConfig::new().with_top_n(2),
    );
    let top = cache.read(ReadStrategy::RankedTop).await.unwrap();
    assert_eq!(wins(top.records()), vec![32, 25]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_top_slice_size_and_order(teams in arb_league(24)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = counting_cache(teams.clone());
            let top = cache.read(ReadStrategy::RankedTop).await.unwrap();

            prop_assert_eq!(top.records().len(), teams.len().min(TOP_N));
            prop_assert!(top.records().windows(2).all(|w| w[0].wins >= w[1].wins));

            let mut all_wins = wins(&teams);
            all_wins.sort_unstable_by(|a, b| b.cmp(a));
            prop_assert_eq!(wins(top.records()), all_wins[..top.records().len()].to_vec());
            for member in top.records() {
                prop_assert!(teams.contains(member));
            }
            Ok(())
        })?;
    }
}

// ============================================================================
// PROPERTY 3: IDEMPOTENT INVALIDATION
// ============================================================================

#[tokio::test]
async fn test_invalidate_twice() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::RankedSet).await.unwrap();
    cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();

    let first = cache.invalidate().await.unwrap();
    let keys_after_first = cache.store().keys();
    let second = cache.invalidate().await.unwrap();

    assert_eq!(first, league().len() as u64 + 1);
    assert_eq!(second, 0);
    assert!(keys_after_first.is_empty());
    assert_eq!(cache.store().keys(), keys_after_first);
}

#[tokio::test]
async fn test_invalidate_empty_cache() {
    let cache = counting_cache(league());
    assert_eq!(cache.invalidate().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalidate_leaves_unrelated_keys() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::RankedSet).await.unwrap();
    cache
        .store()
        .put("standings-note", &"keep me".to_string(), None)
        .await
        .unwrap();

    cache.invalidate().await.unwrap();
    assert_eq!(cache.store().keys(), vec!["standings-note".to_string()]);
}

// ============================================================================
// PROPERTY 4: KEYED COMPLETENESS
// ============================================================================

#[tokio::test]
async fn test_every_team_has_its_own_key() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();

    for expected in league() {
        let cached = cache.cached_team(expected.id).await.unwrap();
        assert_eq!(cached, Some(expected));
    }
    let mut keys = cache.store().keys();
    keys.sort();
    let mut expected_keys: Vec<String> = league().iter().map(|t| format!("team-{}", t.id)).collect();
    expected_keys.sort();
    assert_eq!(keys, expected_keys);
}

#[tokio::test(start_paused = true)]
async fn test_keyed_entries_expire_and_reload() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    let warm = cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();
    assert!(warm.was_cache_hit());

    tokio::time::advance(Duration::from_secs(61)).await;
    let cold = cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();
    assert!(!cold.was_cache_hit());
    assert_eq!(cache.source().loads(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_keyed_read_is_complete(teams in arb_nonempty_league(24)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = counting_cache(teams.clone());
            cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();
            let hit = cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();

            prop_assert!(hit.was_cache_hit());
            prop_assert_eq!(sorted_ids(hit.records()), sorted_ids(&teams));
            prop_assert_eq!(cache.store().key_count(), teams.len());
            for expected in &teams {
                let cached = cache.cached_team(expected.id).await.unwrap();
                prop_assert_eq!(cached.as_ref(), Some(expected));
            }
            Ok(())
        })?;
    }
}

// ============================================================================
// PROPERTY 5: STAMPEDE SAFETY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_ranked_misses_converge() {
    let source = CountingSource::with_teams(league()).with_load_delay(Duration::from_millis(50));
    let cache = counting_cache_with(source, CacheConfig::default());

    let (a, b) = tokio::join!(
        cache.read(ReadStrategy::RankedSet),
        cache.read(ReadStrategy::RankedSet)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(cache.source().loads(), 2);
    assert_eq!(wins(a.records()), league_ranked_wins());
    assert_eq!(wins(b.records()), league_ranked_wins());
    assert_eq!(cache.store().sorted_set_len(SORTED_SET_KEY), league().len());

    let after = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert!(after.was_cache_hit());
    assert_eq!(after.records().len(), league().len());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_keyed_misses_converge() {
    let source = CountingSource::with_teams(league()).with_load_delay(Duration::from_millis(50));
    let cache = counting_cache_with(source, CacheConfig::default());

    let (a, b) = tokio::join!(
        cache.read(ReadStrategy::IndividuallyKeyed),
        cache.read(ReadStrategy::IndividuallyKeyed)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(cache.store().key_count(), league().len());
}

// ============================================================================
// PROPERTY 6: MUTATION THEN INVALIDATION
// ============================================================================

#[tokio::test]
async fn test_mutation_then_invalidate_is_visible_everywhere() {
    let cache = counting_cache(league());
    for strategy in ReadStrategy::ALL {
        cache.read(strategy).await.unwrap();
    }

    let mut changed = cache.source().load_all().await.unwrap();
    for (offset, team) in changed.iter_mut().enumerate() {
        team.wins = offset as u32;
    }
    cache.source().mutate(changed.clone()).await.unwrap();
    cache.invalidate().await.unwrap();

    let expected: Vec<(TeamId, u32)> = {
        let mut pairs: Vec<(TeamId, u32)> = changed.iter().map(|t| (t.id, t.wins)).collect();
        pairs.sort_unstable();
        pairs
    };
    for strategy in [ReadStrategy::RankedSet, ReadStrategy::IndividuallyKeyed] {
        let outcome = cache.read(strategy).await.unwrap();
        let mut got: Vec<(TeamId, u32)> = outcome.records().iter().map(|t| (t.id, t.wins)).collect();
        got.sort_unstable();
        assert_eq!(got, expected, "{strategy}");
    }

    let top = cache.read(ReadStrategy::RankedTop).await.unwrap();
    assert_eq!(wins(top.records()), vec![6, 5, 4, 3, 2]);
}

#[tokio::test]
async fn test_stale_until_invalidated() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::RankedSet).await.unwrap();

    cache.source().mutate(vec![team(3, 33)]).await.unwrap();
    let stale = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert_eq!(stale.records()[0].wins, 32);

    cache.invalidate().await.unwrap();
    let fresh = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert_eq!(fresh.records()[0].id, TeamId::new(3));
    assert_eq!(fresh.records()[0].wins, 33);
}

#[tokio::test]
async fn test_simulate_season_reflected_after_read() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::RankedSet).await.unwrap();

    let played = cache.simulate_season().await.unwrap();
    let outcome = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert!(!outcome.was_cache_hit());
    assert_ranked(outcome.records());

    let mut expected: Vec<(TeamId, u32)> = played.iter().map(|t| (t.id, t.wins)).collect();
    expected.sort_unstable();
    let mut got: Vec<(TeamId, u32)> = outcome.records().iter().map(|t| (t.id, t.wins)).collect();
    got.sort_unstable();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn test_delete_then_details_is_not_found() {
    let cache = counting_cache(league());
    cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();

    cache.delete(TeamId::new(4)).await.unwrap();
    assert_not_found(&cache.details(TeamId::new(4)).await, TeamId::new(4));
    assert!(cache.cached_team(TeamId::new(4)).await.unwrap().is_none());

    let outcome = cache.read(ReadStrategy::IndividuallyKeyed).await.unwrap();
    assert_eq!(outcome.records().len(), league().len() - 1);
}

// ============================================================================
// STORE FAILURES
// ============================================================================

#[tokio::test]
async fn test_unavailable_store_propagates_without_fallback() {
    let cache = counting_cache(league());
    cache.store().set_offline(true);

    for strategy in [
        ReadStrategy::RankedSet,
        ReadStrategy::RankedTop,
        ReadStrategy::IndividuallyKeyed,
    ] {
        assert_store_unavailable(&cache.read(strategy).await);
    }
    assert_eq!(cache.source().loads(), 0);
    assert_store_unavailable(&cache.invalidate().await);
}

#[tokio::test]
async fn test_mutation_with_unavailable_store_reports_failure() {
    let cache = counting_cache(league());
    cache.store().set_offline(true);

    let result = cache.create(team(8, 1)).await;
    assert_store_unavailable(&result);
    // The source change itself went through.
    assert!(cache.source().get(TeamId::new(8)).await.unwrap().is_some());

    cache.store().set_offline(false);
    let outcome = cache.read(ReadStrategy::RankedSet).await.unwrap();
    assert_eq!(outcome.records().len(), league().len() + 1);
}

#[tokio::test]
async fn test_store_recovers_after_outage() {
    let store = Arc::new(InMemoryStore::new());
    let cache = TeamCache::new(
        Arc::clone(&store),
        Arc::new(CountingSource::with_teams(league())),
        CacheConfig::default(),
    );

    store.set_offline(true);
    assert!(cache.read(ReadStrategy::RankedTop).await.is_err());
    store.set_offline(false);

    let top: Vec<Team> = cache
        .read(ReadStrategy::RankedTop)
        .await
        .unwrap()
        .into_records();
    assert_eq!(wins(&top), &league_ranked_wins()[..TOP_N]);
}
