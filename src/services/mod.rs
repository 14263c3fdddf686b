pub(crate) mod attempt_timing;
pub(crate) mod attempts;
pub(crate) mod hemis_oauth;
pub(crate) mod hemis_profile;
pub(crate) mod question_import;
pub(crate) mod scoring;
pub(crate) mod user_sessions;
