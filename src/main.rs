#[tokio::main]
async fn main() {
    rsvp_server::start_server().await;
}
