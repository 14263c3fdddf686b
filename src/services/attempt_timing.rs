use time::PrimitiveDateTime;

use crate::core::time::seconds_between;
use crate::db::types::AttemptStatus;

fn limit_seconds(time_limit_minutes: i32) -> i64 {
    i64::from(time_limit_minutes.max(0)) * 60
}

/// Elapsed time strictly exceeds the limit. Sub-second precision counts,
/// so the attempt is still open at exactly `time_limit * 60` seconds.
pub(crate) fn is_time_expired(
    started_at: PrimitiveDateTime,
    time_limit_minutes: i32,
    now: PrimitiveDateTime,
) -> bool {
    (now - started_at) > time::Duration::seconds(limit_seconds(time_limit_minutes))
}

pub(crate) fn remaining_seconds(
    status: AttemptStatus,
    started_at: PrimitiveDateTime,
    time_limit_minutes: i32,
    now: PrimitiveDateTime,
) -> i64 {
    if status.is_terminal() {
        return 0;
    }
    let elapsed = seconds_between(started_at, now).max(0);
    (limit_seconds(time_limit_minutes) - elapsed).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FinishStamp {
    pub(crate) status: AttemptStatus,
    pub(crate) completed_at: PrimitiveDateTime,
    pub(crate) time_taken_seconds: i32,
}

/// Values to stamp when moving an attempt into `target`. `None` when the
/// attempt already left `in_progress` or `target` is not terminal.
pub(crate) fn finish_stamp(
    current: AttemptStatus,
    target: AttemptStatus,
    started_at: PrimitiveDateTime,
    time_limit_minutes: i32,
    now: PrimitiveDateTime,
) -> Option<FinishStamp> {
    if current.is_terminal() {
        return None;
    }

    let time_taken = match target {
        AttemptStatus::InProgress => return None,
        AttemptStatus::Completed => seconds_between(started_at, now).max(0),
        AttemptStatus::Expired => limit_seconds(time_limit_minutes),
    };

    Some(FinishStamp {
        status: target,
        completed_at: now,
        time_taken_seconds: i32::try_from(time_taken).unwrap_or(i32::MAX),
    })
}
