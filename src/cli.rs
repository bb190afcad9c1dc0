use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "healthcheck")]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Commands related to the web server.
    Server {
        #[command(subcommand)]
        command: Option<ServerCommands>,
    },
    /// Runs the configured checks once and reports the result.
    Check,
    /// Retrieves the detailed status from the running server.
    Status,
}

#[derive(Subcommand, Debug)]
#[command(arg_required_else_help = true)]
pub enum ServerCommands {
    /// Starts the web server and the background checks.
    Start,
    /// Returns whether the web server is running.
    Status,
}
