mod nm_session;
mod repl;
mod ss_session;

use clap::Parser;
use docs_common::error::DocsError;
use docs_common::logging;

#[derive(Parser, Debug)]
#[command(name = "docs-client", about = "Docs++ interactive client")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    nm_host: String,
    #[arg(long, default_value_t = 7000)]
    nm_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), DocsError> {
    let args = Args::parse();
    let _guard = logging::init("client");

    repl::run(&args.nm_host, args.nm_port).await
}
