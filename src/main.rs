use clap::Parser;
use linkspocket::cli::{Args, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let code = Runner::new(args).run().await;
    std::process::exit(code);
}
