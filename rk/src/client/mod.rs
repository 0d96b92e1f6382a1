//! Interactive client
//!
//! Each operation registers intent on the primary participant, asks the
//! coordinator to run a voting round, then issues the gated operation on the
//! primary.

mod command;
mod repl;
mod session;

pub use command::{ClientCommand, CommandError};
pub use repl::ReplSession;
pub use session::{KvClient, Reply};
