#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sdp_signaling_lib::run().await
}
