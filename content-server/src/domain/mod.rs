pub(crate) mod error;
pub(crate) mod listing;
pub(crate) mod post;
pub(crate) mod token;
pub(crate) mod user;
