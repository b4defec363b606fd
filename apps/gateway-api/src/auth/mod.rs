pub mod claims;
pub mod middleware;
