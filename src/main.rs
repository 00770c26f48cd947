//! querydock - run a SQL script on one of six engines.

use querydock::cli::Cli;
use querydock::config::Config;
use querydock::engine::{EngineExecutor, EngineId};
use querydock::error::Result;
use querydock::frame::{BqCliClient, EngineConnection, FrameExecutor};
use querydock::{logging, script};
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // A missing .env is fine
    dotenvy::dotenv().ok();

    match &cli.log_file {
        Some(path) => {
            if let Err(e) = logging::init_file_logging(path) {
                eprintln!("{}: {}", e.category(), e);
                std::process::exit(1);
            }
        }
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let sql = cli.read_script()?;

    if cli.split {
        for statement in script::statements(&sql) {
            println!("{}", script::terminate(statement));
        }
        return Ok(());
    }

    let output = if cli.frame {
        let frames = FrameExecutor::from_config(&config);
        // The columnar service is always reached through its CLI here.
        let mut connection = match EngineId::parse(&cli.engine)? {
            EngineId::BigQuery => Some(EngineConnection::Columnar(Box::new(BqCliClient::new(
                &config.binaries.bq,
            )))),
            _ => None,
        };
        info!(engine = %cli.engine, "Running script to frame");
        frames
            .execute_to_frame(&sql, &cli.engine, connection.as_mut())
            .await?
            .to_string()
    } else {
        let executor = EngineExecutor::from_config(&config);
        let settings = cli.engine_settings(&config);
        info!(engine = %cli.engine, "Running script");
        executor
            .execute_with_format(&sql, &settings, &cli.engine, &cli.output_format(&config))
            .await?
            .to_display_string()
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
