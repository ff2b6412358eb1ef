use proptest::prelude::*;

use economy::model::{ResourceBundle, ResourceKind, new_id};
use market::resources::{
    BundleRequest, MAX_PRICE, MIN_PRICE, ResourceVector, clamp_price, default_supply, fits,
    validate_bundle,
};

fn cpu_bundle(fraction: f64, duration: f64) -> ResourceBundle {
    ResourceBundle {
        id: new_id(),
        cpu_percent: fraction,
        memory_percent: 0.0,
        tokens_percent: 0.0,
        attention_percent: 0.0,
        duration_seconds: duration,
    }
}

proptest! {
    #[test]
    fn clamped_prices_stay_in_bounds(price in -1.0e9..1.0e9f64) {
        let clamped = clamp_price(price);
        prop_assert!((MIN_PRICE..=MAX_PRICE).contains(&clamped));
    }

    #[test]
    fn in_range_prices_are_untouched(price in MIN_PRICE..MAX_PRICE) {
        prop_assert_eq!(clamp_price(price), price);
    }

    #[test]
    fn capacity_seconds_scale_with_duration(
        fraction in 0.0..=1.0f64,
        duration in 0.1..10_000.0f64,
    ) {
        let bundle = cpu_bundle(fraction, duration);
        let expected = fraction * duration;
        prop_assert!((bundle.capacity_seconds(ResourceKind::Cpu) - expected).abs() < 1e-9);
        prop_assert_eq!(bundle.capacity_seconds(ResourceKind::Memory), 0.0);
    }

    /// Anything that fits on a fuller market also fits on an emptier one.
    #[test]
    fn feasibility_is_monotone_in_consumption(
        request in 0.0..=1.0f64,
        lower in 0.0..5.0f64,
        extra in 0.0..5.0f64,
        supply in 0.0..10.0f64,
    ) {
        let mut req = ResourceVector::default();
        req.set(ResourceKind::Cpu, request);

        let mut sup = ResourceVector::default();
        sup.set(ResourceKind::Cpu, supply);

        let mut emptier = ResourceVector::default();
        emptier.set(ResourceKind::Cpu, lower);

        let mut fuller = ResourceVector::default();
        fuller.set(ResourceKind::Cpu, lower + extra);

        if fits(&req, &fuller, &sup) {
            prop_assert!(fits(&req, &emptier, &sup));
        }
    }

    #[test]
    fn valid_bundles_pass_validation(
        fraction in 0.0..=1.0f64,
        duration in 0.001..10_000.0f64,
    ) {
        prop_assert!(validate_bundle(&cpu_bundle(fraction, duration)).is_ok());
    }

    #[test]
    fn oversize_fractions_fail_validation(fraction in 1.001..100.0f64) {
        prop_assert!(validate_bundle(&cpu_bundle(fraction, 10.0)).is_err());
    }

    #[test]
    fn nonpositive_durations_fail_validation(duration in -100.0..=0.0f64) {
        prop_assert!(validate_bundle(&cpu_bundle(0.5, duration)).is_err());
    }

    /// Legacy absolute requests become fractions of configured supply, and
    /// the wall clock falls back to the legacy cpu_seconds field.
    #[test]
    fn legacy_fields_normalize_against_supply(cpu_seconds in 0.1..10.0f64) {
        let bundle = BundleRequest {
            cpu_seconds: Some(cpu_seconds),
            memory_mb: Some(512.0),
            attention_share: Some(1.0),
            ..BundleRequest::default()
        }
        .normalize(&default_supply())
        .unwrap();

        prop_assert!((bundle.cpu_percent - cpu_seconds / 10.0).abs() < 1e-9);
        prop_assert!((bundle.memory_percent - 0.5).abs() < 1e-9);
        prop_assert_eq!(bundle.attention_percent, 1.0);
        prop_assert_eq!(bundle.duration_seconds, cpu_seconds);
    }
}
