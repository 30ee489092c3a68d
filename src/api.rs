pub mod auth;
pub mod swagger_main;
pub mod task;
pub mod terms;

#[cfg(test)]
mod test_util;
