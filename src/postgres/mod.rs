// PostgreSQL target - the engine legacy statements end up running on
//
// - config: pool construction from `BridgeConfig`
// - params: binding `RowValues` as PostgreSQL parameters
// - query: decoding result columns back into `RowValues`
// - executor: `EngineConnection` for pooled clients

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PgPool, build_pg_pool};
pub use query::postgres_extract_value;
