use manzai_core::{LengthSettings, TolerancePolicy};

#[test]
fn symmetric_band_matches_ten_percent() {
    let settings = LengthSettings::default();
    let band = settings.band_for(1000);
    assert_eq!(band.min, 900);
    assert_eq!(band.max, 1100);
    assert!(band.contains(900));
    assert!(band.contains(1100));
    assert!(!band.contains(1101));
}

#[test]
fn asymmetric_band_skews_upward() {
    let policy = TolerancePolicy::Asymmetric {
        below_percent: 10,
        above_percent: 25,
    };
    assert_eq!(policy.bounds(400), (360, 500));
}

#[test]
fn five_percent_band_rounds_outward() {
    let policy = TolerancePolicy::Symmetric { percent: 5 };
    // 333 * 0.95 = 316.35, 333 * 1.05 = 349.65
    assert_eq!(policy.bounds(333), (316, 350));
}

#[test]
fn floor_with_ceiling_uses_target_as_minimum() {
    let settings = LengthSettings {
        policy: TolerancePolicy::FloorWithCeiling {
            ceiling_percent: 150,
        },
        ..LengthSettings::default()
    };
    let band = settings.band_for(600);
    assert_eq!((band.min, band.max), (600, 900));
}

#[test]
fn floor_never_inverts_band() {
    let band = LengthSettings::default().band_for(10);
    assert!(band.min <= band.max);
    assert_eq!(band.min, 100);
}

#[test]
fn clamp_target_applies_default_and_ceiling() {
    let settings = LengthSettings::default();
    assert_eq!(settings.clamp_target(Some(350)), 350);
    assert_eq!(settings.clamp_target(Some(2001)), 2000);
    assert_eq!(settings.clamp_target(Some(u64::MAX)), 2000);
    assert_eq!(settings.clamp_target(None), 350);
}

#[test]
fn tolerance_policy_deserializes_from_tagged_table() {
    let policy: TolerancePolicy =
        serde_json::from_str(r#"{"kind":"asymmetric","below_percent":10,"above_percent":25}"#)
            .unwrap();
    assert_eq!(
        policy,
        TolerancePolicy::Asymmetric {
            below_percent: 10,
            above_percent: 25
        }
    );
}
