pub mod api;
pub mod cache;
pub mod channel;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod navigation;
pub mod notice;
pub mod screens;
pub mod session;

pub use context::AppContext;
pub use error::ClientError;
pub use notice::Notice;
