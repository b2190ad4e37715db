use clap::Parser;
use keyvault::cli::commands::{create, inspect, open, passwd, seal};
use keyvault::cli::{init_tracing, load_settings, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Config errors are reported before logging is set up.
    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };
    init_tracing(&settings.log_level);

    let result = match cli.command {
        Commands::Create { ref file, ref id } => create::execute(file, id.as_deref()),
        Commands::Passwd { ref file } => passwd::execute(file),
        Commands::Seal {
            ref file,
            ref input,
        } => seal::execute(&settings, file, input.as_deref()),
        Commands::Open {
            ref file,
            output: ref dest,
        } => open::execute(file, dest.as_deref()),
        Commands::Inspect { ref file, json } => inspect::execute(file, json),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
