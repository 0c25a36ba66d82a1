pub(crate) mod database;
pub(crate) mod jwt;
pub(crate) mod keys;
pub(crate) mod logging;
pub(crate) mod settings;
