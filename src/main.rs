mod app;
mod cli;

use clap::Parser;
use cli::{Cli, Command, ConfigArgs, RunArgs};
use relay_core::config::{Config, redact};
use relay_core::lifecycle::logging::{LogOptions, init_logging};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => cmd_run(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    // Logging settings come from the file, so load it before the subscriber
    // exists; any load error is reported once logging is up.
    let loaded = Config::load(&args.config.config);
    let defaults = Config::default();
    let file_cfg = loaded.as_ref().unwrap_or(&defaults);

    let _guard = init_logging(&LogOptions {
        level: args.log_level(),
        format: args.log_format.unwrap_or(file_cfg.log_format),
        to_file: file_cfg.logging_to_file,
        dir: file_cfg.log_dir.as_deref(),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let application = app::Application::build(&args, loaded)?;
        application.serve().await
    })
}

fn cmd_check_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    config.require_api_key()?;

    println!("Config '{}' is valid.", args.config);
    println!("  listen:          {}:{}", config.host, config.port);
    println!("  upstream:        {}", config.upstream.chat_completions_url());
    println!("  api key:         {}", redact(&config.upstream.api_key));
    if let Some(ref proxy) = config.upstream.proxy_url {
        println!("  proxy:           {proxy}");
    }
    println!(
        "  models:          {} -> {}",
        config.defaults.model, config.defaults.fallback_model
    );
    println!(
        "  max tokens/temp: {} / {}",
        config.defaults.max_tokens, config.defaults.temperature
    );
    Ok(())
}
