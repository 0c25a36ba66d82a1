pub(crate) mod auth;
pub(crate) mod cors;
pub(crate) mod rate_limit;
pub(crate) mod security;
pub(crate) mod trace;
