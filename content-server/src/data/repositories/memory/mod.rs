//! In-process backend selected with `DATABASE_DRIVER=memory`.

pub(crate) mod post_repository;
pub(crate) mod user_repository;
