#[tokio::main]
async fn main() {
    relay::start(std::env::args()).await;
}
