pub mod common;
pub mod delete;
pub mod edit;
pub mod list;
pub mod new;
pub mod show;
pub mod sync;
pub mod watch;
