pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod portal;
pub(crate) mod quizzes;
pub(crate) mod router;
