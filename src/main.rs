//! CLI entry point for the dirgrab tool.

mod app;
mod cli;
mod config;
mod output;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every resource was downloaded or already present.
    Success,
    /// Some resources failed and some completed.
    Partial,
    /// Discovery or setup failed, or every attempted resource failed.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() {
    let exit = match app::runtime::run_dirgrab().await {
        Ok(exit) => exit,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    std::process::exit(exit.code());
}
