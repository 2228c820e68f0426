use kanso::surface::{BlockKeyword, DataKind, Decl, SignatureKeyword, TypeSig};
use kanso::{KansoConfig, Span};
use tower_lsp::lsp_types::{DocumentSymbol, SymbolKind, Url};

use crate::backend::Backend;

impl Backend {
    pub(super) fn build_document_symbols(
        text: &str,
        uri: &Url,
        config: &KansoConfig,
    ) -> Vec<DocumentSymbol> {
        let path = Self::path_from_uri(uri);
        let parsed = kanso::parse_source(&path, text, config.parse.tab_width);
        Self::symbols_from_decls(text, &parsed.decls)
    }

    fn symbols_from_decls(text: &str, decls: &[Decl]) -> Vec<DocumentSymbol> {
        let mut symbols = Vec::new();
        for decl in decls {
            Self::push_decl_symbols(text, decl, &mut symbols);
        }
        symbols
    }

    fn push_decl_symbols(text: &str, decl: &Decl, out: &mut Vec<DocumentSymbol>) {
        match decl {
            Decl::TypeSignature(sig) => out.extend(Self::signature_symbols(text, sig, "type signature")),
            Decl::Function(function) => {
                let detail = function
                    .signature
                    .as_ref()
                    .map(|_| "function")
                    .unwrap_or("definition");
                out.push(Self::symbol(
                    text,
                    function.name.clone(),
                    Some(detail),
                    SymbolKind::FUNCTION,
                    function.span,
                    None,
                ));
            }
            Decl::Data(data) => {
                let children = data
                    .constructors
                    .iter()
                    .flatten()
                    .filter_map(|constructor| match constructor {
                        Decl::TypeSignature(sig) => {
                            Some(Self::signature_symbols(text, sig, "constructor"))
                        }
                        _ => None,
                    })
                    .flatten()
                    .map(|mut symbol| {
                        symbol.kind = SymbolKind::CONSTRUCTOR;
                        symbol
                    })
                    .collect();
                let detail = match data.keyword {
                    DataKind::Data => "data",
                    DataKind::Codata => "codata",
                };
                out.push(Self::symbol(
                    text,
                    data.name.text.clone(),
                    Some(detail),
                    SymbolKind::ENUM,
                    data.span,
                    Some(children),
                ));
            }
            Decl::Record(record) => {
                let mut children = Vec::new();
                for directive in &record.directives {
                    if let Some(name) = &directive.name {
                        children.push(Self::symbol(
                            text,
                            name.text.clone(),
                            Some(directive.form.keyword()),
                            SymbolKind::CONSTRUCTOR,
                            directive.span,
                            None,
                        ));
                    }
                }
                for inner in record.body.iter().flatten() {
                    Self::push_decl_symbols(text, inner, &mut children);
                }
                out.push(Self::symbol(
                    text,
                    record.name.text.clone(),
                    Some("record"),
                    SymbolKind::STRUCT,
                    record.span,
                    Some(children),
                ));
            }
            Decl::Module(module) => out.push(Self::symbol(
                text,
                module.name.text.clone(),
                Some("module"),
                SymbolKind::MODULE,
                module.span,
                Some(Self::symbols_from_decls(text, &module.body)),
            )),
            Decl::ModuleMacro(module) => out.push(Self::symbol(
                text,
                module.name.text.clone(),
                Some("module application"),
                SymbolKind::MODULE,
                module.span,
                None,
            )),
            Decl::Block(block) => {
                let children = Self::symbols_from_decls(text, &block.decls);
                if block.keyword == BlockKeyword::Mutual {
                    out.extend(children);
                } else {
                    out.push(Self::symbol(
                        text,
                        block.keyword.keyword().to_string(),
                        Some("block"),
                        SymbolKind::NAMESPACE,
                        block.span,
                        Some(children),
                    ));
                }
            }
            Decl::Signatures(block) => {
                let (detail, kind) = match block.keyword {
                    SignatureKeyword::Field => ("field", SymbolKind::FIELD),
                    SignatureKeyword::Primitive => ("primitive", SymbolKind::FUNCTION),
                    SignatureKeyword::Variable => ("variable", SymbolKind::VARIABLE),
                };
                for sig in &block.sigs {
                    out.extend(Self::signature_symbols(text, sig, detail).into_iter().map(
                        |mut symbol| {
                            symbol.kind = kind;
                            symbol
                        },
                    ));
                }
            }
            Decl::Infix(infix) => {
                let detail = format!("{} {}", infix.fixity.keyword(), infix.precedence);
                for name in &infix.names {
                    out.push(Self::symbol(
                        text,
                        name.text.clone(),
                        Some(detail.as_str()),
                        SymbolKind::OPERATOR,
                        infix.span,
                        None,
                    ));
                }
            }
            Decl::Syntax(syntax) => out.push(Self::symbol(
                text,
                syntax.name.text.clone(),
                Some("syntax"),
                SymbolKind::OPERATOR,
                syntax.span,
                None,
            )),
            Decl::PatternSynonym(pattern) => out.push(Self::symbol(
                text,
                pattern.name.text.clone(),
                Some("pattern"),
                SymbolKind::CONSTANT,
                pattern.span,
                None,
            )),
            Decl::Unquote(unquote) => {
                for name in &unquote.names {
                    out.push(Self::symbol(
                        text,
                        name.text.clone(),
                        Some("unquote"),
                        SymbolKind::FUNCTION,
                        unquote.span,
                        None,
                    ));
                }
            }
            Decl::Clause(_)
            | Decl::Directive(_)
            | Decl::Import(_)
            | Decl::Pragma(_)
            | Decl::Error(_) => {}
        }
    }

    fn signature_symbols(text: &str, sig: &TypeSig, detail: &str) -> Vec<DocumentSymbol> {
        sig.names
            .iter()
            .map(|name| {
                Self::symbol(
                    text,
                    name.text.clone(),
                    Some(detail),
                    SymbolKind::FUNCTION,
                    sig.span,
                    None,
                )
            })
            .collect()
    }

    #[allow(deprecated)]
    fn symbol(
        text: &str,
        name: String,
        detail: Option<&str>,
        kind: SymbolKind,
        span: Span,
        children: Option<Vec<DocumentSymbol>>,
    ) -> DocumentSymbol {
        let range = Self::span_to_range(text, span);
        DocumentSymbol {
            name,
            detail: detail.map(str::to_string),
            kind,
            tags: None,
            deprecated: None,
            range,
            selection_range: range,
            children,
        }
    }
}
