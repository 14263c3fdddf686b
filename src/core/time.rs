use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

/// All timestamps are stored as naive UTC.
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_optional(value: Option<PrimitiveDateTime>) -> Option<String> {
    value.map(format_primitive)
}

/// Whole seconds from `from` to `to`; negative when `to` is earlier.
pub(crate) fn seconds_between(from: PrimitiveDateTime, to: PrimitiveDateTime) -> i64 {
    (to - from).whole_seconds()
}
