mod backend;
mod diagnostics;
mod document_symbols;
mod server;
mod state;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() {
    server::run().await;
}
