//! One module per subcommand.  Each exposes an `execute` entry point that
//! takes the resolved [`Config`](crate::config::Config).

pub mod add;
pub mod completions;
pub mod dump;
pub mod generate;
pub mod list;
pub mod remove;
pub mod rename;
pub mod server;
