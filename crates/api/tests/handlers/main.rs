#[path = "../test_utils.rs"]
mod test_utils;

mod games_test;
mod middleware_test;
mod sessions_test;
mod webhooks_test;
