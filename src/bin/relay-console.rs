use clap::Parser;
use color_eyre::Result;
use serial_relay::client::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, Level};

/// Attaches this terminal to a running serial relay.
/// Lines typed are sent to the serial device, and serial output is printed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Relay address.
    #[arg(short, long, default_value = "localhost")]
    address: String,

    /// Relay port.
    #[arg(short, long, default_value_t = serial_relay::server::DEFAULT_PORT)]
    port: u16,
}

async fn run(args: Args) -> Result<()> {
    let client = Client::connect(&args.address, args.port).await?;
    info!("Connected to {}:{}", args.address, args.port);

    let (mut writer, mut reader) = client.split();

    let mut output = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();

        while let Some(message) = reader.next_message().await? {
            stdout.write_all(&message).await?;
            stdout.flush().await?;
        }

        debug!("Relay closed the session");
        Ok::<_, color_eyre::Report>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Stdin closed");
                    return Ok(());
                };

                writer.send(line).await?;
                // Sent on its own, like pressing enter in a terminal would.
                writer.send("\r").await?;
            }
            result = &mut output => {
                return result?;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    serial_relay::logging::init(Level::WARN, None).await;

    let args = Args::parse();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting")
        }
        result = run(args) => {
            if let Err(e) = &result {
                error!(?e, "Console stopped");
            }
            return result;
        }
    }

    Ok(())
}
