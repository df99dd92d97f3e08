#[tokio::main]
async fn main() {
    excursions::start_server().await;
}
