//! Language server backend.
//!
//! Hover, completion and go-to-definition resolve `Module.function`
//! expressions against the shared [`Registry`]. The `luamod.convertModule`
//! command rewrites an open `module(...)` file through a workspace edit.
//! Module files inside the configured module directories are kept current
//! through the client's file watcher.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error as RpcError, Result as RpcResult};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, Documentation, ExecuteCommandOptions, ExecuteCommandParams,
    FileChangeType, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents,
    HoverParams, HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams,
    Location, MarkupContent, MarkupKind, MessageType, OneOf, Position, Range, Registration,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit,
    Url, WorkspaceEdit,
};
use tower_lsp::{Client, LanguageServer};

use luamod_syntax::{self as syntax, RewriteOutcome};

use crate::config::Config;
use crate::discover;
use crate::query;
use crate::registry::Registry;

/// Command that converts the document given as its single URI argument.
pub const CONVERT_COMMAND: &str = "luamod.convertModule";

const WATCHER_ID: &str = "luamod-module-files";

const NO_DOCUMENT_MESSAGE: &str = "please open a file first";

pub struct Backend {
    client: Client,
    registry: Arc<Registry>,
    documents: DashMap<Url, String>,
    config: RwLock<Config>,
    /// Module directories of every workspace folder.
    module_roots: RwLock<Vec<PathBuf>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            registry: Arc::new(Registry::new()),
            documents: DashMap::new(),
            config: RwLock::new(Config::default()),
            module_roots: RwLock::new(Vec::new()),
        }
    }

    fn document_text(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(|doc| doc.value().clone())
    }

    async fn register_file_watcher(&self) {
        let registration = Registration {
            id: WATCHER_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(serde_json::json!({
                "watchers": [{ "globPattern": discover::MODULE_GLOB }]
            })),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            tracing::warn!("[lsp] file watcher registration failed: {e}");
        }
    }

    /// Clear the registry and index every module directory on a blocking
    /// thread. Returns immediately.
    fn spawn_reindex(&self, roots: Vec<PathBuf>) {
        let registry = Arc::clone(&self.registry);
        let client = self.client.clone();
        tokio::spawn(async move {
            let indexed = tokio::task::spawn_blocking(move || {
                registry.clear();
                registry.load_all(&roots, |progress| {
                    tracing::debug!("[lsp] indexing modules {progress}");
                })
            })
            .await;
            match indexed {
                Ok(summary) => {
                    client
                        .log_message(
                            MessageType::INFO,
                            format!(
                                "luamod: indexed {} modules from {} files",
                                summary.modules, summary.files
                            ),
                        )
                        .await;
                }
                Err(e) => tracing::error!("[lsp] indexing task failed: {e}"),
            }
        });
    }

    async fn apply_conversion(&self, file_name: &str, edit: WorkspaceEdit) {
        match self.client.apply_edit(edit).await {
            Ok(response) if response.applied => {}
            Ok(response) => tracing::warn!(
                "[lsp] client rejected conversion of {file_name}: {}",
                response.failure_reason.unwrap_or_default()
            ),
            Err(e) => tracing::warn!("[lsp] applying conversion of {file_name} failed: {e}"),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        let roots = workspace_roots(&params);
        let config = Config::from_init_options(params.initialization_options);
        let module_roots: Vec<PathBuf> = roots
            .iter()
            .flat_map(|root| config.module_roots(root))
            .collect();
        tracing::info!("[lsp] initialize: module roots {:?}", module_roots);
        *self.config.write().await = config;
        *self.module_roots.write().await = module_roots;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string(), "\"".to_string()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![CONVERT_COMMAND.to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "luamod-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.register_file_watcher().await;

        if !self.config.read().await.index_on_startup {
            tracing::info!("[lsp] startup indexing disabled");
            return;
        }
        let roots = self.module_roots.read().await.clone();
        self.spawn_reindex(roots);
    }

    async fn shutdown(&self) -> RpcResult<()> {
        self.registry.clear();
        self.documents.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents
            .insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change holds the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents.insert(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let roots = self.module_roots.read().await.clone();
        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };
            if !discover::is_watched(&path, &roots) {
                tracing::trace!("[lsp] ignoring change outside module dirs: {}", path.display());
                continue;
            }
            if change.typ == FileChangeType::DELETED {
                if let Some(module) = self.registry.forget(&path) {
                    tracing::debug!("[lsp] {} deleted, dropped {}", path.display(), module.name);
                }
                continue;
            }
            match self.registry.on_file_changed(&path) {
                Ok(Some(module)) => tracing::debug!("[lsp] reindexed {}", module.name),
                Ok(None) => tracing::debug!("[lsp] {} declares no module", path.display()),
                Err(e) => tracing::warn!("[lsp] {e}"),
            }
        }
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let params = params.text_document_position_params;
        let Some(text) = self.document_text(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(hover_at(&self.registry, &text, params.position))
    }

    async fn completion(&self, params: CompletionParams) -> RpcResult<Option<CompletionResponse>> {
        let params = params.text_document_position;
        let Some(text) = self.document_text(&params.text_document.uri) else {
            return Ok(None);
        };
        let items = completion_items(&self.registry, &text, params.position);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> RpcResult<Option<GotoDefinitionResponse>> {
        let params = params.text_document_position_params;
        let Some(text) = self.document_text(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(definition_at(&self.registry, &text, params.position))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> RpcResult<Option<Value>> {
        if params.command != CONVERT_COMMAND {
            return Err(RpcError::invalid_params(format!(
                "unknown command: {}",
                params.command
            )));
        }
        match conversion_for(params.arguments, &self.documents) {
            Conversion::Notice(typ, message) => self.client.show_message(typ, message).await,
            Conversion::Apply { file_name, edit } => self.apply_conversion(&file_name, edit).await,
        }
        Ok(None)
    }
}

/// What `luamod.convertModule` does for a given set of arguments.
#[derive(Debug, PartialEq)]
enum Conversion {
    /// Show a message and change nothing.
    Notice(MessageType, String),
    Apply { file_name: String, edit: WorkspaceEdit },
}

fn conversion_for(arguments: Vec<Value>, documents: &DashMap<Url, String>) -> Conversion {
    let document = arguments
        .into_iter()
        .next()
        .and_then(|arg| serde_json::from_value::<Url>(arg).ok())
        .and_then(|uri| {
            let text = documents.get(&uri).map(|doc| doc.value().clone())?;
            Some((uri, text))
        });
    let Some((uri, text)) = document else {
        return Conversion::Notice(MessageType::WARNING, NO_DOCUMENT_MESSAGE.to_string());
    };

    let file_name = display_name(&uri);
    let rewrite = match syntax::rewrite(&text) {
        Ok(RewriteOutcome::NoChanges) => {
            return Conversion::Notice(
                MessageType::INFO,
                format!("[{file_name}] requires no changes"),
            );
        }
        Ok(RewriteOutcome::Rewritten(rewrite)) => rewrite,
        Err(e) => {
            tracing::error!("[lsp] conversion of {file_name} failed: {e}");
            return Conversion::Notice(
                MessageType::ERROR,
                format!("[{file_name}] conversion failed: {e}"),
            );
        }
    };

    tracing::info!(
        "[lsp] converting {file_name}: module {} with {} functions, {} edits",
        rewrite.module_name,
        rewrite.functions.len(),
        rewrite.edits.len()
    );
    let edits = rewrite
        .edits
        .into_iter()
        .map(|edit| TextEdit::new(to_lsp_range(edit.range), edit.new_text))
        .collect();
    Conversion::Apply {
        file_name,
        edit: WorkspaceEdit::new(HashMap::from([(uri, edits)])),
    }
}

/// File name of a document as shown to the user.
fn display_name(uri: &Url) -> String {
    uri.to_file_path()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| uri.to_string())
}

fn hover_at(registry: &Registry, text: &str, position: Position) -> Option<Hover> {
    let resolved = query::resolve_at_position(registry, text, from_lsp_position(position))?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: query::format_doc(&resolved.function, true),
        }),
        range: None,
    })
}

fn completion_items(registry: &Registry, text: &str, position: Position) -> Vec<CompletionItem> {
    query::completion_candidates(registry, text, from_lsp_position(position))
        .into_iter()
        .map(|candidate| CompletionItem {
            label: candidate.name,
            kind: Some(CompletionItemKind::FUNCTION),
            documentation: Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: query::format_doc(&candidate.function, false),
            })),
            ..Default::default()
        })
        .collect()
}

fn definition_at(registry: &Registry, text: &str, position: Position) -> Option<GotoDefinitionResponse> {
    let resolved = query::resolve_at_position(registry, text, from_lsp_position(position))?;
    let location = resolved.function.location;
    let Ok(uri) = Url::from_file_path(&location.path) else {
        tracing::warn!("[lsp] cannot build a URI for {}", location.path.display());
        return None;
    };
    Some(GotoDefinitionResponse::Scalar(Location::new(
        uri,
        to_lsp_range(location.range),
    )))
}

fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        return folders
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
    }
    #[allow(deprecated)]
    let root = params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok());
    root.into_iter().collect()
}

fn from_lsp_position(position: Position) -> syntax::Position {
    syntax::Position::new(position.line, position.character)
}

fn to_lsp_position(position: syntax::Position) -> Position {
    Position::new(position.line, position.character)
}

fn to_lsp_range(range: syntax::Range) -> Range {
    Range::new(to_lsp_position(range.start), to_lsp_position(range.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use tower_lsp::lsp_types::WorkspaceFolder;

    const CALC: &str = "module(\"CalcM\", package.seeall)\n\n-- Computes something\n-- @param n number the count\nfunction compute(n)\n  return n\nend\n\nfunction reset()\nend\n";

    const FOO: &str = "module(\"Foo\", package.seeall);\nfunction bar(x)\n  return x\nend\n";

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.index_text(Path::new("/ws/src/CalcM.lua"), CALC);
        registry
    }

    fn open(documents: &DashMap<Url, String>, uri: &str, text: &str) -> Url {
        let uri = Url::parse(uri).unwrap();
        documents.insert(uri.clone(), text.to_string());
        uri
    }

    #[test]
    fn convert_without_open_document_warns() {
        let documents = DashMap::new();
        open(&documents, "file:///ws/src/FooM.lua", FOO);
        let warning = Conversion::Notice(MessageType::WARNING, "please open a file first".to_string());

        assert_eq!(conversion_for(Vec::new(), &documents), warning);
        assert_eq!(conversion_for(vec![json!(42)], &documents), warning);
        assert_eq!(
            conversion_for(vec![json!("file:///ws/src/OtherM.lua")], &documents),
            warning
        );
    }

    #[test]
    fn convert_plain_file_requires_no_changes() {
        let documents = DashMap::new();
        let uri = open(&documents, "file:///ws/src/My%20M.lua", "local M = {}\nreturn M\n");

        assert_eq!(
            conversion_for(vec![json!(uri)], &documents),
            Conversion::Notice(MessageType::INFO, "[My M.lua] requires no changes".to_string())
        );
    }

    #[test]
    fn convert_module_file_builds_workspace_edit() {
        let documents = DashMap::new();
        let uri = open(&documents, "file:///ws/src/FooM.lua", FOO);

        let Conversion::Apply { file_name, edit } = conversion_for(vec![json!(uri)], &documents)
        else {
            panic!("expected an edit");
        };
        assert_eq!(file_name, "FooM.lua");
        let changes = edit.changes.unwrap();
        let edits = &changes[&uri];
        assert_eq!(edits.len(), 3);
        assert_eq!(
            edits[0],
            TextEdit::new(
                Range::new(Position::new(0, 0), Position::new(0, 30)),
                "Foo = {};".to_string()
            )
        );
        assert_eq!(
            edits[1],
            TextEdit::new(
                Range::new(Position::new(1, 9), Position::new(1, 12)),
                "Foo.bar".to_string()
            )
        );
    }

    #[test]
    fn hover_shows_documentation() {
        let hover = hover_at(&registry(), "CalcM.compute(1)", Position::new(0, 8)).unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup");
        };
        assert_eq!(markup.kind, MarkupKind::Markdown);
        assert!(markup.value.starts_with("```lua\nfunction compute(n: number)\n```\n---\n"));
        assert!(hover_at(&registry(), "CalcM.nothing()", Position::new(0, 8)).is_none());
    }

    #[test]
    fn completion_lists_module_functions() {
        let items = completion_items(&registry(), "calcm.", Position::new(0, 6));
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["compute", "reset"]);
        assert_eq!(items[0].kind, Some(CompletionItemKind::FUNCTION));
        let Some(Documentation::MarkupContent(doc)) = &items[0].documentation else {
            panic!("expected markup documentation");
        };
        assert!(!doc.value.contains("---"));
    }

    #[test]
    fn definition_points_at_function_name() {
        let response = definition_at(&registry(), "CalcM.reset()", Position::new(0, 7)).unwrap();
        assert_eq!(
            response,
            GotoDefinitionResponse::Scalar(Location::new(
                Url::parse("file:///ws/src/CalcM.lua").unwrap(),
                Range::new(Position::new(8, 9), Position::new(8, 14)),
            ))
        );
    }

    #[test]
    fn display_name_decodes_file_uris() {
        assert_eq!(display_name(&Url::parse("file:///ws/My%20M.lua").unwrap()), "My M.lua");
        assert_eq!(
            display_name(&Url::parse("untitled:Untitled-1").unwrap()),
            "untitled:Untitled-1"
        );
    }

    #[test]
    fn roots_prefer_workspace_folders() {
        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(Url::parse("file:///root-uri").unwrap()),
            workspace_folders: Some(vec![
                WorkspaceFolder {
                    uri: Url::parse("file:///ws/a").unwrap(),
                    name: "a".into(),
                },
                WorkspaceFolder {
                    uri: Url::parse("file:///ws/b").unwrap(),
                    name: "b".into(),
                },
            ]),
            ..Default::default()
        };
        assert_eq!(
            workspace_roots(&params),
            vec![PathBuf::from("/ws/a"), PathBuf::from("/ws/b")]
        );
    }

    #[test]
    fn roots_fall_back_to_root_uri() {
        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(Url::parse("file:///ws").unwrap()),
            ..Default::default()
        };
        assert_eq!(workspace_roots(&params), vec![PathBuf::from("/ws")]);
        assert!(workspace_roots(&InitializeParams::default()).is_empty());
    }
}
