use std::path::Path;

use super::denied_hint;

#[test]
fn denied_hint_points_at_config_and_reconcile() {
    let hint = denied_hint(Path::new(".remindme/config.toml"));
    assert!(hint.starts_with("warning: exact alarms are not permitted"));
    assert!(hint.contains("`exact_alarms_allowed = true` in .remindme/config.toml"));
    assert!(hint.contains("remindme reconcile"));
}
