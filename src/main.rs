#[tokio::main]
async fn main() {
    if let Err(e) = pawscare_lib::run().await {
        tracing::error!(error = %e, "Fatal startup error");
        eprintln!("pawscare: {e}");
        std::process::exit(1);
    }
}
