pub mod json_dir;
pub mod postgres;

pub use json_dir::JsonDirStore;
pub use postgres::PgStore;
