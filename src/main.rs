#[tokio::main]
async fn main() -> anyhow::Result<()> {
    usage_timeline_lib::run().await
}
