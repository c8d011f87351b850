//! dhcpmux - DHCPv4/BOOTP relay and server dispatcher.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dhcpmux::config::{Cli, Mode};
use dhcpmux::dispatcher::{self, Dispatcher};
use dhcpmux::domain::registry;
use dhcpmux::{client, PROGVER};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list || cli.list_json {
        print!("{}", registry::render_listing(cli.list_json, cli.pretty));
        if cli.list_json {
            println!();
        }
        return Ok(());
    }
    if cli.ipv6 {
        anyhow::bail!("IPv6 is not implemented");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.mode() {
        Mode::Client => client::run(&cli),
        mode => serve(cli, mode),
    }
}

fn serve(cli: Cli, mode: Mode) -> anyhow::Result<()> {
    info!(
        mode = %mode,
        version = PROGVER,
        pid = std::process::id(),
        "start"
    );

    let dispatcher_mode = match mode {
        Mode::Relay => dispatcher::Mode::Relay,
        _ => dispatcher::Mode::Server,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let dispatcher = Dispatcher::bind(
            dispatcher_mode,
            &cli.interface_list(),
            cli.bind_address(),
            cli.port,
            cli.relay_target(),
            cli.relay_address,
        )
        .await?;
        dispatcher.run(cli.backend_config()).await
    })
}
