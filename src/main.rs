use messaging_client::{cli, config, error, logging};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;
    if command == cli::Command::Help {
        println!("{}", cli::usage());
        return Ok(());
    }

    let cfg = config::Config::from_env()?;
    cli::run(command, &cfg).await
}
