//! Property-based tests using proptest

use std::time::Duration;

use proptest::prelude::*;
use sentinel::config::parse_sites;
use sentinel::events::{BackpressurePolicy, BroadcastHub, HubEvent};
use sentinel::health::UptimeCalculator;
use sentinel::types::Endpoint;

fn calculator(window_mins: u64, interval_secs: u64) -> UptimeCalculator {
    UptimeCalculator::new(
        Duration::from_secs(window_mins * 60),
        Duration::from_secs(interval_secs),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn uptime_ratio_stays_within_unit_interval(
        window_mins in 1u64..=1440,
        interval_secs in 1u64..=60,
        reachable in 0u64..100_000,
    ) {
        let calc = calculator(window_mins, interval_secs);
        let ratio = calc.ratio_from_count(reachable);
        prop_assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn uptime_ratio_is_monotonic_in_reachable_count(
        window_mins in 1u64..=1440,
        interval_secs in 1u64..=60,
        a in 0u64..5_000,
        b in 0u64..5_000,
    ) {
        let calc = calculator(window_mins, interval_secs);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(calc.ratio_from_count(low) <= calc.ratio_from_count(high));
    }

    #[test]
    fn uptime_is_full_when_every_expected_sample_is_reachable(
        window_mins in 1u64..=1440,
        interval_secs in 1u64..=60,
    ) {
        let calc = calculator(window_mins, interval_secs);
        let ratio = calc.ratio_from_count(calc.expected_samples());
        prop_assert!((ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn derived_ids_are_lowercase_slugs(name in "\\PC{0,40}") {
        let id = Endpoint::derive_id(&name);
        prop_assert!(!id.starts_with('-'));
        prop_assert!(!id.ends_with('-'));
        prop_assert!(!id.contains("--"));
        prop_assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn derive_id_is_idempotent(name in "[A-Za-z0-9 _().-]{0,40}") {
        let id = Endpoint::derive_id(&name);
        prop_assert_eq!(Endpoint::derive_id(&id), id);
    }

    #[test]
    fn parse_sites_preserves_file_order(
        names in prop::collection::btree_set("[a-z][a-z0-9]{0,11}", 1..8),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let sites: Vec<serde_json::Value> = names
            .iter()
            .map(|n| serde_json::json!({ "name": n, "url": format!("https://{}.example.com", n) }))
            .collect();
        let json = serde_json::json!({ "sites": sites }).to_string();

        let endpoints = parse_sites(&json).unwrap();
        let ids: Vec<&str> = endpoints.iter().map(|e| e.id.as_str()).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn publish_accounts_for_every_subscriber(
        buffer in 1usize..8,
        subscribers in 0usize..10,
        publishes in 1usize..20,
    ) {
        let hub = BroadcastHub::with_config(buffer, BackpressurePolicy::DropLatest);
        let _subs: Vec<_> = (0..subscribers).map(|_| hub.subscribe()).collect();

        for cycle in 1..=publishes as u64 {
            let report = hub.publish(HubEvent::Snapshot { cycle, payload: "{}".into() });
            prop_assert_eq!(report.attempted(), subscribers);
            prop_assert_eq!(report.closed, 0);
            // 誰も読まないので、バッファが埋まった後はすべて破棄される
            let expected_delivered = if (cycle as usize) <= buffer { subscribers } else { 0 };
            prop_assert_eq!(report.delivered, expected_delivered);
        }
    }
}
