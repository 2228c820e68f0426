//! Names a file makes visible to its importers, read straight off the CST.

use std::collections::HashSet;

use crate::surface::*;

/// Exported names in declaration order, without duplicates. Declarations inside `private`
/// blocks are skipped; a flush module header exports its body rather than itself.
pub fn exported_names(decls: &[Decl]) -> Vec<String> {
    let mut collector = Collector::default();
    collector.decls(decls);
    collector.names
}

#[derive(Default)]
struct Collector {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl Collector {
    fn push(&mut self, name: &str) {
        if name.is_empty() || name == "..." {
            return;
        }
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }

    fn sigs(&mut self, sigs: &[TypeSig]) {
        for sig in sigs {
            for name in &sig.names {
                self.push(&name.text);
            }
        }
    }

    fn decls(&mut self, decls: &[Decl]) {
        for decl in decls {
            self.decl(decl);
        }
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::TypeSignature(sig) => self.sigs(std::slice::from_ref(sig)),
            Decl::Function(function) => self.push(&function.name),
            Decl::Data(data) => {
                self.push(&data.name.text);
                if let Some(constructors) = &data.constructors {
                    self.decls(constructors);
                }
            }
            Decl::Record(record) => {
                self.push(&record.name.text);
                for directive in &record.directives {
                    if let Some(name) = &directive.name {
                        self.push(&name.text);
                    }
                }
                for field in record.body.iter().flatten() {
                    if let Decl::Signatures(SignatureBlock {
                        keyword: SignatureKeyword::Field,
                        sigs,
                        ..
                    }) = field
                    {
                        self.sigs(sigs);
                    }
                }
            }
            Decl::Module(module) if module.flush => self.decls(&module.body),
            Decl::Module(module) => self.push(&module.name.text),
            Decl::ModuleMacro(module) => self.push(&module.name.text),
            Decl::Block(block) => {
                if block.keyword != BlockKeyword::Private {
                    self.decls(&block.decls);
                }
            }
            Decl::Signatures(block) => {
                if block.keyword == SignatureKeyword::Primitive {
                    self.sigs(&block.sigs);
                }
            }
            Decl::PatternSynonym(synonym) => self.push(&synonym.name.text),
            Decl::Unquote(unquote) => {
                if unquote.form == UnquoteForm::Decl {
                    for name in &unquote.names {
                        self.push(&name.text);
                    }
                }
            }
            Decl::Syntax(_) => {}
            Decl::Clause(_)
            | Decl::Directive(_)
            | Decl::Import(_)
            | Decl::Pragma(_)
            | Decl::Infix(_)
            | Decl::Error(_) => {}
        }
    }
}
