use goaltrack_core::{GoalNight, NightValidationError, NOT_EVALUATED};

#[test]
fn new_night_starts_unsaved_and_not_evaluated() {
    let night = GoalNight::new();

    assert_eq!(night.night_id, 0);
    assert!(!night.is_saved());
    assert!(night.created_at > 0);
    assert_eq!(night.goal_1, None);
    assert_eq!(night.goal_2, None);
    assert_eq!(night.goal_3, None);
    assert_eq!(night.num_achieved, NOT_EVALUATED);
    assert!(!night.is_evaluated());
}

#[test]
fn set_goals_overwrites_fields_and_keeps_identity() {
    let mut night = GoalNight::with_created_at(1_700_000_000_000);
    night.night_id = 7;

    night.set_goals("sleep", "read", "none", 2);
    night.set_goals("walk", "", "cook", 0);

    assert_eq!(night.night_id, 7);
    assert_eq!(night.created_at, 1_700_000_000_000);
    assert_eq!(night.goal_1.as_deref(), Some("walk"));
    assert_eq!(night.goal_2.as_deref(), Some(""));
    assert_eq!(night.goal_3.as_deref(), Some("cook"));
    assert_eq!(night.num_achieved, 0);
    assert!(night.is_evaluated());
}

#[test]
fn validate_accepts_any_count_but_rejects_negative_timestamp() {
    let mut night = GoalNight::with_created_at(0);
    night.num_achieved = 99;
    assert!(night.validate().is_ok());

    let invalid = GoalNight::with_created_at(-5);
    assert_eq!(
        invalid.validate().unwrap_err(),
        NightValidationError::InvalidCreatedAt(-5)
    );
}

#[test]
fn night_serialization_uses_expected_wire_fields() {
    let mut night = GoalNight::with_created_at(1_700_000_000_000);
    night.night_id = 3;
    night.set_goals("sleep", "read", "none", 2);

    let json = serde_json::to_value(&night).unwrap();
    assert_eq!(json["night_id"], 3);
    assert_eq!(json["created_at"], 1_700_000_000_000_i64);
    assert_eq!(json["goal_1"], "sleep");
    assert_eq!(json["goal_2"], "read");
    assert_eq!(json["goal_3"], "none");
    assert_eq!(json["num_achieved"], 2);

    let decoded: GoalNight = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, night);
}
