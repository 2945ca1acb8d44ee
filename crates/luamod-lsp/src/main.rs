use luamod_lsp::logging;
use luamod_lsp::server::Backend;
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    logging::init("info");
    tracing::info!("[lsp] luamod-lsp {} starting", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
