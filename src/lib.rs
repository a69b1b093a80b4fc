pub mod catalog;
pub mod dates;
pub mod db;
pub mod error;
pub mod model;
pub mod output;
pub mod persist;
pub mod plans;
pub mod store;
pub mod timeline;
pub mod tui;
pub mod validate;
pub mod watch;
