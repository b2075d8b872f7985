pub mod cache;
pub mod db;

pub use cache::RedisTokenStore;
pub use db::DbAdapter;
