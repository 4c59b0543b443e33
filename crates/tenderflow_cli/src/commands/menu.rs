use super::{reset, run, status};
use anyhow::Result;
use std::io::{self, Write};
use tenderflow_schema::RunContext;

/// The interactive entry point: a small menu wrapping the other commands.
pub async fn execute(ctx: &RunContext) -> Result<i32> {
    loop {
        println!();
        println!("tenderflow");
        println!("  [1] run ingestion");
        println!("  [2] show status");
        println!("  [3] reset ledger");
        println!("  [q] quit");
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        match input.trim() {
            "1" => return run::execute(ctx).await,
            "2" => status::execute(ctx).await?,
            "3" => reset::execute(ctx).await?,
            "q" | "Q" => return Ok(run::EXIT_OK),
            other => println!("unrecognized choice: {other}"),
        }
    }
}
