#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shipagent::run_cli().await
}
