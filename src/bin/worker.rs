#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examdesk::run_worker().await {
        eprintln!("examdesk-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
