#[tokio::main]
async fn main() -> anyhow::Result<()> {
    watchlist_sync::run().await
}
