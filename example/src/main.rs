use elysees::client::Elysees;
use log::{info, warn};
use std::env;
use std::sync::mpsc::channel;
use std::time::Duration;

// Takes a lease, keeps it renewed until Ctrl-C, then gives it back.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let url = env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080/elysees-api/v1".to_string());
    let name = env::args().nth(2).unwrap_or_else(|| "elysees-demo".to_string());

    let (tx, rx) = channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    let client = Elysees::for_lease_server(url)?;
    info!("server time: {}", client.is_alive().await?);

    let Some(mut lease) = client
        .request_lease_until_granted(&name, Duration::from_secs(5), Duration::from_secs(30))
        .await?
    else {
        warn!("{name} still held by someone else, giving up");
        return Ok(());
    };

    info!(
        "holding {} (token={}) for {:?}",
        lease.name(),
        lease.token(),
        lease.granted_duration()
    );

    // Wait for Ctrl-C, renewing when less than 2s are left.
    while rx.try_recv().is_err() {
        if !lease.renew_if_near_expiry(Duration::from_secs(2)).await? {
            warn!("lost {name}");
            return Ok(());
        }

        info!("{name} expires in {:?}", lease.duration_till_expiry());
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    lease.release().await?;
    Ok(())
}
