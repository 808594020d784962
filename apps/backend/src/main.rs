#[tokio::main]
async fn main() -> anyhow::Result<()> {
    study_rewards_backend::run().await
}
