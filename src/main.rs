#[tokio::main]
async fn main() {
    if let Err(e) = postcare_lib::run().await {
        tracing::error!(error = %e, "Postcare stopped");
        eprintln!("postcare: {e}");
        std::process::exit(1);
    }
}
