#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = hemis_quiz::run().await {
        eprintln!("hemis-quiz fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
