pub mod chat;
pub mod query;
pub mod serve;
pub mod tools;
