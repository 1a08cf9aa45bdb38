#[tokio::main]
async fn main() -> std::io::Result<()> {
    heatmark_lib::run().await
}
