use clap::Parser;
use std::process::ExitCode;
use timeline_append::{
    AppConfig, AppendOutcome, Appender, CliArgs, Command, LoggingConfig, init_logging,
};

fn main() -> anyhow::Result<ExitCode> {
    let _guard = init_logging(LoggingConfig::from_env())?;

    let cli = CliArgs::parse();
    let config = AppConfig::from_args(&cli)?;
    let appender = Appender::new(config.engine.clone());
    let path = config.workbook.as_path();

    let outcome = match &cli.command {
        Command::Append(args) => {
            let request = args.to_request()?;
            if args.no_retry {
                appender.append(path, &request)
            } else {
                appender.append_with_retry(path, &request)
            }
        }
        Command::Headers => match appender.load_headers(path) {
            Ok(headers) => {
                if cli.json {
                    println!("{}", serde_json::to_string(&headers)?);
                } else {
                    for header in headers {
                        println!("{header}");
                    }
                }
                return Ok(ExitCode::SUCCESS);
            }
            Err(outcome) => outcome,
        },
        Command::Validate => {
            match appender.validate_schema(path, &config.engine.required_columns) {
                Ok(missing) if missing.is_empty() => {
                    if cli.json {
                        println!("{}", serde_json::to_string(&AppendOutcome::Ok)?);
                    } else {
                        println!("all required columns present");
                    }
                    return Ok(ExitCode::SUCCESS);
                }
                Ok(missing) => AppendOutcome::SchemaMismatch(missing),
                Err(outcome) => outcome,
            }
        }
    };

    report(&outcome, cli.json)?;
    Ok(exit_code(&outcome))
}

fn report(outcome: &AppendOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
    } else if outcome.is_ok() {
        println!("{outcome}");
    } else {
        eprintln!("{outcome}");
    }
    Ok(())
}

fn exit_code(outcome: &AppendOutcome) -> ExitCode {
    match outcome {
        AppendOutcome::Ok => ExitCode::SUCCESS,
        AppendOutcome::FileLocked => ExitCode::from(2),
        other if other.is_user_correctable() => ExitCode::from(3),
        _ => ExitCode::from(4),
    }
}
