// File: testing-framework/src/main.rs
//
// lk-tester: runs the registered multi-node scenarios against a node and a
// client binary. The exit code is the number of failed tests, or 2 when the
// run itself could not start.

use anyhow::{Context, Result};
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info};

use lk_testing_framework::{cases, config::Config, registry::TestRegistry, VERSION};

const RUNNER_ERROR_CODE: i32 = 2;

fn init_logging(config: &Config) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::BrightBlack);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] {} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                colors.color(record.level()),
                message
            ))
        })
        .level(config.log_level.into())
        // Per-test records are already written to the test's own file
        .level_for(lk_testing_framework::logger::LOG_TARGET, log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()
        .context("Error while installing the logger")
}

async fn run(config: Config) -> Result<i32> {
    let mut registry = TestRegistry::new();
    cases::register_all(&mut registry)?;

    if config.list {
        for name in registry.enabled_names() {
            println!("{}", name);
        }
        for name in registry.disabled_names() {
            println!("{} (disabled)", name);
        }
        return Ok(0);
    }

    let settings = config.environment_settings()?;
    settings.validate()?;
    std::fs::create_dir_all(&settings.run_dir)
        .with_context(|| format!("Error while creating {}", settings.run_dir.display()))?;

    info!("lk-tester {} using {} client", VERSION, settings.client_type);
    let summary = registry.run(&config.tests, &settings).await?;
    Ok(summary.exit_code())
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    if config.generate_config_template {
        let code = match config.config_file.as_ref() {
            Some(path) => match config.write_template(path) {
                Ok(()) => {
                    println!("Config file template generated at {}", path.display());
                    0
                }
                Err(e) => {
                    eprintln!("{}", e);
                    RUNNER_ERROR_CODE
                }
            },
            None => {
                eprintln!("Provided config file path is required to generate the template with --config-file");
                RUNNER_ERROR_CODE
            }
        };
        std::process::exit(code);
    }

    let config = match config.load_file() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error while reading config file: {}", e);
            std::process::exit(RUNNER_ERROR_CODE);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("{:#}", e);
        std::process::exit(RUNNER_ERROR_CODE);
    }

    let code = match run(config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            RUNNER_ERROR_CODE
        }
    };
    std::process::exit(code);
}
