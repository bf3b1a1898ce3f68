use chrono::{DateTime, SubsecRound, Utc};

/// Current instant at the precision the database keeps (microseconds), so a
/// watermark written from this value compares the same way in every store.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
