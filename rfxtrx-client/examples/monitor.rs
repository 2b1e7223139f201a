//! Print everything an RFXtrx receives.
//!
//! ```bash
//! RUST_LOG=rfxtrx_rs_client=debug cargo run --example monitor -p rfxtrx-rs-client -- 192.168.1.20:10001
//! ```

use std::pin::pin;

use rfxtrx_rs_client::{EngineConfig, EngineEvent, RfxEngine, TcpConnector};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rfxtrx_rs_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:10001".to_owned());

    let engine = RfxEngine::new(TcpConnector::new(addr), EngineConfig::default());
    let mut events = pin!(engine.events());

    engine.open()?;
    let status = engine.ready().await?;
    println!(
        "{} firmware {}, protocols: {}",
        status.receiver_type,
        status.firmware_version,
        status
            .protocols
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    );

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(EngineEvent::Decoded(decoded)) => println!("{decoded:?}"),
                Some(EngineEvent::Disconnect { reason }) => {
                    println!("disconnected: {reason}");
                    break;
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                engine.close().await?;
                break;
            }
        }
    }
    Ok(())
}
