//! Decides whether an interval between two commits counts as work.

/// Label the host reports when nothing happened.
pub const IDLE_EVENT: &str = "NONE";
pub const WINDOW_DEACTIVATE_EVENT: &str = "WINDOW_DEACTIVATE";

/// Timers and 3D input device polling fire on their own, without the user touching anything.
const PASSIVE_PREFIXES: [&str; 2] = ["TIMER", "NDOF_"];

/// Returns true for events caused by the user.
pub fn is_user_activity(kind: &str) -> bool {
    kind != IDLE_EVENT
        && kind != WINDOW_DEACTIVATE_EVENT
        && !PASSIVE_PREFIXES
            .iter()
            .any(|prefix| kind.starts_with(prefix))
}

/// An interval is work if at least one of the events seen during it is user activity.
pub fn is_work_interval<'a>(kinds: impl IntoIterator<Item = &'a str>) -> bool {
    kinds.into_iter().any(is_user_activity)
}
