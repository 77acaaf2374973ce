//! Durable conversation storage backends for quill.
//!
//! Both backends implement the same `qchat::ConversationStore` contract:
//! SQLite for embedded and single-node deployments, Postgres for the hosted
//! path. Every flush is one short transaction — append the buffered text,
//! bump the conversation's activity marker, commit.

mod postgres;
mod sqlite;

pub use postgres::{PostgresConversationStore, PostgresStoreConfig};
pub use sqlite::{SqliteConversationStore, default_sqlite_path};

pub mod prelude {
    pub use crate::{
        PostgresConversationStore, PostgresStoreConfig, SqliteConversationStore,
        default_sqlite_path,
    };
}
