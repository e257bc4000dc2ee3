use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() {
    let cli = promptmeter_cli::Cli::parse();
    match promptmeter_cli::run(cli).await {
        Ok(output) => {
            println!("{output}");
        }
        Err(err) => {
            eprintln!("{} {err}", "error:".red());
            std::process::exit(1);
        }
    }
}
