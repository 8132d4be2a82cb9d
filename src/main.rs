//! Interactive call console over the loopback transport and render sink.
//! Pass `--native` to capture from real devices (feature `native-capture`).

use anyhow::Context;
use callroom::backends::{LoopbackCapture, LoopbackTransport, MemorySink};
use callroom::capture::{DeviceCapture, TrackKind};
use callroom::session::CallNotification;
use callroom::transport::ParticipantId;
use callroom::{CallConfig, CallController, CallCoordinator};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "commands: join <app-id> <channel> | mic | camera | leave | \
remote-join <uid> | remote-publish <uid> | remote-leave <uid> | drop <reason> | show | quit";

/// Command-line options: `callroom [--native] [config.json]`
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    config_path: Option<String>,
    native: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = Self::default();
        for arg in args {
            match arg.as_str() {
                "--native" => options.native = true,
                _ => options.config_path = Some(arg),
            }
        }
        options
    }
}

/// Camera and microphone backend; real devices need the `native-capture` feature
fn capture_backend(native: bool) -> Arc<dyn DeviceCapture> {
    #[cfg(feature = "native-capture")]
    {
        if native {
            let camera = std::env::var("CALLROOM_CAMERA").ok();
            return Arc::new(callroom::capture::native::NativeCapture::new(camera));
        }
    }

    #[cfg(not(feature = "native-capture"))]
    {
        if native {
            tracing::warn!("Built without native-capture; using loopback devices");
        }
    }

    Arc::new(LoopbackCapture::new())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    callroom::init_tracing();

    let options = Options::parse(std::env::args().skip(1));
    let config = match &options.config_path {
        Some(path) => CallConfig::load(path).with_context(|| format!("loading config from {path}"))?,
        None => CallConfig::from_env(),
    };

    let (transport, events) = LoopbackTransport::new(config.client);
    let transport = Arc::new(transport);
    let coordinator = CallCoordinator::new(
        config,
        transport.clone(),
        capture_backend(options.native),
        Arc::new(MemorySink::new()),
    );
    let (call, task) = CallController::spawn(coordinator, events);

    let mut notifications = call.subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(CallNotification::Error(error)) => eprintln!("! {}", error.message),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["join", rest @ ..] => {
                let app_id = rest.first().copied().unwrap_or_default();
                let channel = rest.get(1).copied().unwrap_or_default();
                call.join(app_id, channel).await
            }
            ["mic"] => call.toggle_device(TrackKind::Audio).await,
            ["camera"] => call.toggle_device(TrackKind::Video).await,
            ["leave"] => call.leave().await,
            ["remote-join", uid] => {
                transport.remote_join(&ParticipantId::new(*uid));
                Ok(())
            }
            ["remote-publish", uid] => {
                let participant = ParticipantId::new(*uid);
                transport.remote_publish(&participant, TrackKind::Video);
                transport.remote_publish(&participant, TrackKind::Audio);
                Ok(())
            }
            ["remote-leave", uid] => {
                transport.remote_leave(&ParticipantId::new(*uid));
                Ok(())
            }
            ["drop", reason @ ..] => {
                transport.drop_connection(&reason.join(" "));
                Ok(())
            }
            ["show"] => {
                let view = call.snapshot().await?;
                println!("{}", serde_json::to_string_pretty(&view)?);
                Ok(())
            }
            _ => {
                println!("{HELP}");
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("error: {e}");
        }
        println!("[{:?}]", call.status());
    }

    call.shutdown().await.ok();
    task.await.context("call controller task failed")?;
    Ok(())
}
