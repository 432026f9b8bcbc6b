#[tokio::main]
async fn main() -> anyhow::Result<()> {
    humyze_lib::run().await
}
