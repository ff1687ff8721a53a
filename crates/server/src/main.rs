#[tokio::main]
async fn main() -> anyhow::Result<()> {
    onboard_server::start().await
}
