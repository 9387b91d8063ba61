use clap::{Parser, Subcommand};
use eyre::Context;
use std::sync::Arc;
use video_client_demo::auth;
use video_client_demo::backend::{self, BackendConfig};
use video_client_demo::config::DemoConfig;
use video_client_demo::logging::{self, LogConfig};
use video_client_demo::webhook::WebhookProcessor;

#[derive(Debug, Parser)]
#[command(version, about = "Real-time video client demo")]
struct Cli {
    #[command(flatten)]
    log: LogConfig,

    #[command(flatten)]
    demo: DemoConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a broadcaster token for a fresh stream key and print it.
    Token,

    /// Run the demo backend.
    Backend(BackendConfig),

    /// Run both screens against the in-memory SDK and print what they render.
    #[cfg(feature = "simulate")]
    Simulate {
        /// Manifest URL to submit on the playback screen.
        #[arg(long, default_value = "https://example.com/manifest.m3u8")]
        manifest_url: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log)?;

    match cli.command {
        Command::Token => {
            let http = auth::http_client().context("build http client")?;
            let stream_key = auth::uuidv4();
            let credentials = cli.demo.broadcaster_credentials(&stream_key);
            let token = auth::fetch_token(&http, &credentials.auth_url, &credentials.request())
                .await
                .context("fetch broadcaster token")?;
            tracing::info!(%stream_key, "token issued");
            println!("{token}");
        }
        Command::Backend(config) => {
            backend::run(&config, Arc::new(WebhookProcessor::default()))
                .await
                .context("run demo backend")?;
        }
        #[cfg(feature = "simulate")]
        Command::Simulate { manifest_url } => {
            simulate::run(cli.demo, &manifest_url)
                .await
                .context("simulate screens")?;
        }
    }

    Ok(())
}

#[cfg(feature = "simulate")]
mod simulate {
    use eyre::Context;
    use std::sync::Arc;
    use video_client_demo::auth;
    use video_client_demo::config::DemoConfig;
    use video_client_demo::logging::Logger;
    use video_client_demo::screens::{EncoderScreen, Layout, ManifestScreen};
    use video_client_sdk::mock::MockSdk;

    pub(super) async fn run(config: DemoConfig, manifest_url: &str) -> eyre::Result<()> {
        let sdk = Arc::new(MockSdk::new());
        let http = auth::http_client().context("build http client")?;

        let encoder = EncoderScreen::new(
            Arc::clone(&sdk),
            config.clone(),
            Logger::for_video_client(),
            http,
        );
        encoder.activate().await;
        println!("== encoder ==\n{}", Layout(&encoder.render().await));
        let stream_name = &encoder.config().stream_name;
        encoder
            .call_state()
            .with(|state| state.join_broadcast(stream_name))
            .await;
        encoder.deactivate().await;

        let manifest = ManifestScreen::new(Arc::clone(&sdk), config);
        manifest.activate().await;
        manifest.set_input(manifest_url).await;
        manifest.submit().await.context("submit manifest url")?;
        println!("== manifest ==\n{}", Layout(&manifest.render().await));
        manifest.deactivate().await;

        for call in sdk.journal().calls() {
            tracing::debug!(?call, "sdk call");
        }
        eyre::ensure!(
            sdk.live_clients() == 0 && sdk.open_controllers() == 0 && sdk.live_player_uis() == 0,
            "screens leaked sdk resources"
        );
        Ok(())
    }
}
