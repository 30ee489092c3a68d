pub mod auth;
pub mod task;
pub mod terms;
pub mod user;

#[cfg(test)]
pub mod test_util;
