#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server_school_lib::run().await
}
