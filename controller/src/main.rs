mod host;
mod plant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
