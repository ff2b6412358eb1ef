/// Current wall-clock time as epoch milliseconds.
///
/// Every persisted timestamp in the system goes through this helper so that
/// ordering within one process is monotone under a sane clock.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
