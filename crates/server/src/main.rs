#[tokio::main]
async fn main() -> anyhow::Result<()> {
    callboard_server::start().await
}
