pub(crate) mod admins;
pub(crate) mod attempts;
pub(crate) mod health;
pub(crate) mod login_history;
pub(crate) mod question_batches;
pub(crate) mod question_options;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod responses;
pub(crate) mod results;
pub(crate) mod student_groups;
pub(crate) mod students;
pub(crate) mod user_sessions;
