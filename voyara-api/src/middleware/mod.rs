pub mod rate_limit;

pub use rate_limit::{click_rate_limit, client_ip, impression_rate_limit, RateLimitPolicy};
