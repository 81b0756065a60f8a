// Command implementations, one module per subcommand

pub mod locate;
pub mod status;
pub mod sync;
