use std::{
    net::{Ipv4Addr, SocketAddr},
    process::ExitCode,
};

use color_eyre::Report;
use serial_relay::{
    buffer::RingBuffer,
    cli::{self, Cli},
    config::Config,
    error::Error,
    logging,
    relay::Relay,
    serial::{serial_port::SerialPortBuilder, BaudRate},
    transport::websocket::WebsocketTransport,
};
use tracing::{debug, error, info, Level};

/// Exit code for a configuration which makes no sense.
const CONFIG_EXIT_CODE: u8 = 255;

async fn run(device: &str, baud: BaudRate, config: &Config) -> Result<(), Error> {
    let serial = SerialPortBuilder::new(device).baud(baud).open()?;

    let inbound = RingBuffer::new(config.inbound_capacity).map_err(Error::Allocation)?;

    let transport =
        WebsocketTransport::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port))).await?;

    info!(
        %device, %baud, address = %transport.local_addr(),
        "All systems go"
    );

    Relay::new(transport, serial, inbound, config).run().await
}

#[cfg(unix)]
async fn hangup() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::hangup()) {
        Ok(mut hangup) => {
            hangup.recv().await;
        }
        Err(e) => {
            debug!(?e, "Cannot listen for hangups");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn hangup() {
    std::future::pending::<()>().await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("{e:?}");
    }

    let mut cli = match Cli::from_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(exit) => {
            exit.report();
            return ExitCode::from(exit.exit_code());
        }
    };

    if let Some(command) = cli.command.take() {
        return match cli::handle_command(command) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{:?}", Report::new(e));
                ExitCode::from(CONFIG_EXIT_CODE)
            }
        };
    }

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    let stdout_level = if config.options.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    logging::init(
        stdout_level,
        config.log_dir.clone().map(|dir| (stdout_level, dir)),
    )
    .await;
    debug!(?config, "Using config");

    let Some(device) = cli.device.as_deref() else {
        error!("No serial device given");
        return ExitCode::from(cli::CliExit::Usage.exit_code());
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
            ExitCode::SUCCESS
        }
        _ = hangup() => {
            info!("Told to hang up, quitting");
            ExitCode::SUCCESS
        }
        result = run(device, cli.baud, &config) => {
            let e = match result {
                Ok(()) => Error::Transport("Relay stopped unexpectedly".into()),
                Err(e) => e,
            };
            let code = e.exit_code();
            error!(code, "{:?}", Report::new(e));

            ExitCode::from(code)
        }
    }
}
