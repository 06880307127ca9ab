// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use dermaview_db::{Session, Store};
use dermaview_http::Client;
use dermaview_ipc::{Bridge, SettingsFile};
use dermaview_testkit::ClinicFaker;
use runtime::TtyDialogs;
use std::env;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DERMAVIEW_LOG";
const DEMO_SEED: u64 = 20_250_301;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `dermaview --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let settings_path = config.settings_path()?;
    if options.print_settings_path {
        println!("{}", settings_path.display());
        return Ok(());
    }

    init_logging(config.log_level())?;

    let http = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    let settings = SettingsFile::new(settings_path);
    settings.load()?;
    if options.check_only {
        return Ok(());
    }

    let mut session = Session::default();
    if options.demo {
        session.attach(demo_store()?)?;
    }

    let mut bridge = Bridge::new(
        session,
        http,
        settings,
        config::downloads_dir()?,
        Box::new(TtyDialogs),
    );
    info!(
        settings = %bridge.settings().path().display(),
        api = bridge.http().base_url(),
        timeout = ?bridge.http().timeout(),
        demo = options.demo,
        "dermaview bridge ready"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    dermaview_ipc::serve(stdin.lock(), stdout.lock(), &mut bridge)?;

    bridge.session_mut().close()?;
    info!("input closed, shutting down");
    Ok(())
}

fn init_logging(default_level: &str) -> Result<()> {
    let filter = match env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("parse {LOG_ENV} filter directives"))?,
        _ => EnvFilter::try_new(default_level)
            .with_context(|| format!("parse [log] level {default_level:?}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow::anyhow!("initialise logging: {error}"))
}

fn demo_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.ensure_schema()?;

    let mut faker = ClinicFaker::new(DEMO_SEED);
    let images = faker.clinic_images(12, 4);
    let outcomes = store.upload_images(&images)?;
    let inserted = outcomes.iter().filter(|outcome| outcome.inserted).count();
    info!(inserted, "seeded demo images");
    Ok(store)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_settings_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_settings_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-settings-path" => {
                options.print_settings_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("dermaview: local bridge for the dermaview desktop renderer");
    println!("Reads one JSON request per line on stdin and answers on stdout.");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-settings-path    Print resolved settings.json path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Start connected to an in-memory database with fake images");
    println!("  --check                  Validate config, API client and settings, then exit");
    println!("  --help                   Show this help");
}
