#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = hemis_quiz::run_worker().await {
        eprintln!("hemis-quiz-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
