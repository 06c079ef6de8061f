mod cli;

use crate::cli::Cli;
use clap::Parser;
use eyre::{eyre, Result};
use kosmokopy_core::{
    cancel::CancelToken, Coordinator, Method, Mode, Source, TransferRequest,
};
use kosmokopy_core::endpoint::Endpoint;
use std::process::ExitCode;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
}

#[cfg(unix)]
async fn install_cancel_handler(cancel: CancelToken) {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        log::warn!("received shutdown signal, cancelling run");
        cancel.cancel();
    });
}

#[cfg(not(unix))]
async fn install_cancel_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });
}

fn build_request(cli: &Cli) -> Result<TransferRequest> {
    let destination = Endpoint::parse(&cli.dst)?;

    let source = if !cli.src_files.is_empty() {
        Source::Files(cli.src_files.clone())
    } else if let Some(src) = &cli.src {
        Source::Endpoint(Endpoint::parse(src)?)
    } else {
        return Err(eyre!("one of --src or --src-files is required"));
    };

    Ok(TransferRequest {
        source,
        destination,
        move_files: cli.move_files,
        conflict: cli.conflict.into(),
        strip_spaces: cli.strip_spaces,
        mode: Mode::from(cli.mode),
        method: Method::from(cli.method),
        exclude: cli.exclude.clone(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    if !cli.cli {
        eprintln!("kosmokopy: the --cli flag is required for non-interactive invocation");
        return Ok(ExitCode::from(1));
    }

    let request = match build_request(&cli) {
        Ok(r) => r,
        Err(e) => {
            let report = kosmokopy_core::TransferReport::fatal(e.to_string());
            let json = serde_json::to_string(&report).expect("report always serializes");
            println!("{json}");
            return Ok(ExitCode::from(report.exit_code() as u8));
        }
    };

    let cancel = CancelToken::new();
    install_cancel_handler(cancel.clone()).await;

    let coordinator = Coordinator::new(cancel);
    let report = coordinator.run(&request).await;

    let exit_code = report.exit_code();
    let json = serde_json::to_string(&report).expect("report always serializes");
    println!("{json}");

    Ok(ExitCode::from(exit_code as u8))
}
