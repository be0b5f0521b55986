//! Reference resolution across files
//!
//! Maps a type name written in one file to the qualified name of the
//! declaration it denotes, following the file's import bindings and the
//! re-export chains of the modules they point at.

use std::collections::BTreeMap;

use tracing::trace;

use crate::core::{
    normalize_path, parent_dir, ExportBinding, FileTable, ImportedName, NamingScheme,
    QualifiedName, Symbol,
};

/// Re-export chains longer than this are treated as unresolved
const MAX_EXPORT_DEPTH: usize = 8;

/// Suffixes tried, in order, when a module specifier has no file of its own
const MODULE_SUFFIXES: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".d.ts",
    ".mts",
    ".cts",
    "/index.ts",
    "/index.tsx",
    "/index.d.ts",
    "/index.mts",
    "/index.cts",
];

/// Emitted JavaScript extensions that map back to TypeScript sources
const SCRIPT_EXTENSIONS: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx", ".d.ts"]),
    (".jsx", &[".tsx"]),
    (".mjs", &[".mts"]),
    (".cjs", &[".cts"]),
];

/// Name lookup over every file table of one build
pub struct Resolver<'a> {
    files: BTreeMap<&'a str, &'a FileTable>,
    naming: NamingScheme,
    /// Declarations by declared name, for `NamingScheme::Global`
    by_name: BTreeMap<&'a str, &'a Symbol>,
}

impl<'a> Resolver<'a> {
    pub fn new(files: BTreeMap<&'a str, &'a FileTable>, naming: NamingScheme) -> Self {
        let mut by_name = BTreeMap::new();
        if naming == NamingScheme::Global {
            for table in files.values() {
                for symbol in &table.symbols {
                    by_name.entry(symbol.name.as_str()).or_insert(symbol);
                }
            }
        }
        Self {
            files,
            naming,
            by_name,
        }
    }

    /// Resolve `name` as written in `table`: same-file declarations first,
    /// then the file's import bindings.
    pub fn resolve(&self, table: &FileTable, name: &str) -> Option<QualifiedName> {
        match name.split_once('.') {
            None => {
                if let Some(symbol) = table.symbol(name) {
                    return Some(symbol.qualified_name.clone());
                }
                self.resolve_binding(table, name, 0)
            }
            // `ns.Name` through `import * as ns`
            Some((head, rest)) if !rest.contains('.') => {
                let binding = table.imports.iter().find(|b| b.alias == head)?;
                if binding.imported != ImportedName::Namespace {
                    return None;
                }
                let module = self.resolve_module(&table.path, &binding.module)?;
                self.resolve_export(&module, rest, 0)
            }
            Some(_) => None,
        }
    }

    /// Resolve an imported alias in `table`
    fn resolve_binding(&self, table: &FileTable, alias: &str, depth: usize) -> Option<QualifiedName> {
        let binding = table.imports.iter().find(|b| b.alias == alias)?;
        let module = self.resolve_module(&table.path, &binding.module);
        let resolved = match (&binding.imported, &module) {
            (ImportedName::Named(exported), Some(module)) => {
                self.resolve_export(module, exported, depth + 1)
            }
            (ImportedName::Default, Some(module)) => self.resolve_default(module, depth + 1),
            _ => None,
        };

        resolved.or_else(|| match &binding.imported {
            ImportedName::Named(exported) => self.resolve_global(exported),
            _ => None,
        })
    }

    /// Declaration exported from `path` under the name `exported`
    fn resolve_export(&self, path: &str, exported: &str, depth: usize) -> Option<QualifiedName> {
        if depth > MAX_EXPORT_DEPTH {
            trace!(path, exported, "Export chain too deep");
            return None;
        }
        if exported == "default" {
            return self.resolve_default(path, depth);
        }
        let table = self.files.get(path)?;

        if let Some(local) = table.exports_local(exported) {
            if let Some(symbol) = table.symbol(local) {
                return Some(symbol.qualified_name.clone());
            }
            // `import { A } from "./a"; export { A };`
            if let Some(resolved) = self.resolve_binding(table, local, depth + 1) {
                return Some(resolved);
            }
        }

        for export in &table.exports {
            match export {
                ExportBinding::From {
                    imported,
                    exported: e,
                    module,
                } if e == exported => {
                    let Some(target) = self.resolve_module(path, module) else {
                        continue;
                    };
                    if let Some(resolved) = self.resolve_export(&target, imported, depth + 1) {
                        return Some(resolved);
                    }
                }
                _ => {}
            }
        }

        table.exports.iter().find_map(|export| match export {
            ExportBinding::All { module } => {
                let target = self.resolve_module(path, module)?;
                self.resolve_export(&target, exported, depth + 1)
            }
            _ => None,
        })
    }

    fn resolve_default(&self, path: &str, depth: usize) -> Option<QualifiedName> {
        if depth > MAX_EXPORT_DEPTH {
            return None;
        }
        let table = self.files.get(path)?;
        let local = table.default_export()?;
        match table.symbol(local) {
            Some(symbol) => Some(symbol.qualified_name.clone()),
            None => self.resolve_binding(table, local, depth + 1),
        }
    }

    /// Declared-name fallback when qualified names carry no path
    fn resolve_global(&self, name: &str) -> Option<QualifiedName> {
        if self.naming != NamingScheme::Global {
            return None;
        }
        self.by_name.get(name).map(|s| s.qualified_name.clone())
    }

    /// Path of the workspace file a module specifier denotes, if any
    pub fn resolve_module(&self, from: &str, specifier: &str) -> Option<String> {
        let relative = specifier.starts_with("./") || specifier.starts_with("../");
        if !relative && !specifier.starts_with('/') {
            // bare specifiers name packages outside the workspace
            return None;
        }

        let dir = parent_dir(from);
        let base = if specifier.starts_with('/') || dir.is_empty() {
            normalize_path(specifier)
        } else {
            normalize_path(&format!("{}/{}", dir, specifier))
        };

        for candidate in module_candidates(&base) {
            if self.files.contains_key(candidate.as_str()) {
                return Some(candidate);
            }
        }
        None
    }
}

/// File paths a resolved module base may refer to, most specific first
fn module_candidates(base: &str) -> Vec<String> {
    let mut candidates: Vec<String> = MODULE_SUFFIXES
        .iter()
        .map(|suffix| format!("{}{}", base, suffix))
        .collect();

    for (script, sources) in SCRIPT_EXTENSIONS {
        if let Some(stem) = base.strip_suffix(script) {
            candidates.extend(sources.iter().map(|ext| format!("{}{}", stem, ext)));
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ImportBinding, Modifiers, SymbolKind};

    fn table(path: &str, exported: &[&str]) -> FileTable {
        let mut table = FileTable::new(path);
        for name in exported {
            let mut symbol = Symbol::new(
                NamingScheme::FileScoped.qualify(path, name),
                *name,
                SymbolKind::Class,
                path,
            );
            symbol.modifiers = Modifiers {
                exported: true,
                ..Default::default()
            };
            table.symbols.push(symbol);
        }
        table
    }

    fn import(alias: &str, imported: ImportedName, module: &str) -> ImportBinding {
        ImportBinding {
            alias: alias.to_string(),
            imported,
            module: module.to_string(),
        }
    }

    fn resolver<'a>(tables: &'a [FileTable]) -> Resolver<'a> {
        let files = tables.iter().map(|t| (t.path.as_str(), t)).collect();
        Resolver::new(files, NamingScheme::FileScoped)
    }

    #[test]
    fn test_module_candidates() {
        let candidates = module_candidates("src/engine.js");
        assert!(candidates.contains(&"src/engine.ts".to_string()));
        assert_eq!(module_candidates("src/a")[1], "src/a.ts");
    }

    #[test]
    fn test_resolve_module() {
        let tables = vec![
            table("src/models/animal.ts", &[]),
            table("src/models/index.ts", &[]),
            table("src/app.tsx", &[]),
        ];
        let r = resolver(&tables);
        assert_eq!(
            r.resolve_module("src/app.tsx", "./models/animal").as_deref(),
            Some("src/models/animal.ts")
        );
        assert_eq!(
            r.resolve_module("src/app.tsx", "./models").as_deref(),
            Some("src/models/index.ts")
        );
        assert_eq!(
            r.resolve_module("src/models/animal.ts", "../app").as_deref(),
            Some("src/app.tsx")
        );
        assert_eq!(
            r.resolve_module("src/app.tsx", "./models/animal.js").as_deref(),
            Some("src/models/animal.ts")
        );
        assert_eq!(r.resolve_module("src/app.tsx", "react"), None);
        assert_eq!(r.resolve_module("src/app.tsx", "./missing"), None);
    }

    #[test]
    fn test_same_file_wins_over_import() {
        let mut dog = table("dog.ts", &["Dog", "Animal"]);
        dog.imports
            .push(import("Animal", ImportedName::Named("Animal".into()), "./animal"));
        let tables = vec![dog, table("animal.ts", &["Animal"])];
        let r = resolver(&tables);
        assert_eq!(r.resolve(&tables[0], "Animal").as_deref(), Some("dog.ts::Animal"));
    }

    #[test]
    fn test_named_default_and_namespace_imports() {
        let mut app = table("app.ts", &[]);
        app.imports.extend([
            import("Motor", ImportedName::Named("Engine".into()), "./engine"),
            import("Car", ImportedName::Default, "./car"),
            import("parts", ImportedName::Namespace, "./parts"),
        ]);
        let mut car = table("car.ts", &["Car"]);
        car.symbols[0].modifiers.is_default = true;
        let tables = vec![
            app,
            table("engine.ts", &["Engine"]),
            car,
            table("parts.ts", &["Wheel"]),
        ];
        let r = resolver(&tables);

        assert_eq!(r.resolve(&tables[0], "Motor").as_deref(), Some("engine.ts::Engine"));
        assert_eq!(r.resolve(&tables[0], "Car").as_deref(), Some("car.ts::Car"));
        assert_eq!(r.resolve(&tables[0], "parts.Wheel").as_deref(), Some("parts.ts::Wheel"));
        assert_eq!(r.resolve(&tables[0], "parts.Missing"), None);
        assert_eq!(r.resolve(&tables[0], "Engine"), None);
        assert_eq!(r.resolve(&tables[0], "parts"), None);
    }

    #[test]
    fn test_unexported_declarations_are_not_importable() {
        let mut app = table("app.ts", &[]);
        app.imports
            .push(import("Hidden", ImportedName::Named("Hidden".into()), "./lib"));
        let mut lib = table("lib.ts", &["Hidden"]);
        lib.symbols[0].modifiers.exported = false;
        let tables = vec![app, lib];
        assert_eq!(resolver(&tables).resolve(&tables[0], "Hidden"), None);
    }

    #[test]
    fn test_reexport_chains() {
        let mut app = table("app.ts", &[]);
        app.imports.extend([
            import("Circle", ImportedName::Named("Circle".into()), "./shapes"),
            import("Square", ImportedName::Named("Box".into()), "./shapes"),
            import("Line", ImportedName::Named("Line".into()), "./shapes"),
        ]);
        let mut shapes = table("shapes/index.ts", &[]);
        shapes.exports.extend([
            ExportBinding::All {
                module: "./circle".into(),
            },
            ExportBinding::From {
                imported: "Square".into(),
                exported: "Box".into(),
                module: "./square".into(),
            },
            ExportBinding::Local {
                local: "Line".into(),
                exported: "Line".into(),
            },
        ]);
        shapes
            .imports
            .push(import("Line", ImportedName::Named("Line".into()), "./line"));
        let tables = vec![
            app,
            shapes,
            table("shapes/circle.ts", &["Circle"]),
            table("shapes/square.ts", &["Square"]),
            table("shapes/line.ts", &["Line"]),
        ];
        let r = resolver(&tables);

        assert_eq!(
            r.resolve(&tables[0], "Circle").as_deref(),
            Some("shapes/circle.ts::Circle")
        );
        assert_eq!(
            r.resolve(&tables[0], "Square").as_deref(),
            Some("shapes/square.ts::Square")
        );
        assert_eq!(r.resolve(&tables[0], "Line").as_deref(), Some("shapes/line.ts::Line"));
    }

    #[test]
    fn test_cyclic_reexports_terminate() {
        let mut a = table("a.ts", &[]);
        a.exports.push(ExportBinding::All { module: "./b".into() });
        a.imports
            .push(import("Ghost", ImportedName::Named("Ghost".into()), "./b"));
        let mut b = table("b.ts", &[]);
        b.exports.push(ExportBinding::All { module: "./a".into() });
        let tables = vec![a, b];
        assert_eq!(resolver(&tables).resolve(&tables[0], "Ghost"), None);
    }

    #[test]
    fn test_global_fallback() {
        let mut app = FileTable::new("app.ts");
        app.imports
            .push(import("Engine", ImportedName::Named("Engine".into()), "engine-lib"));
        let mut lib = FileTable::new("lib/engine.ts");
        lib.symbols
            .push(Symbol::new("Engine", "Engine", SymbolKind::Class, "lib/engine.ts"));
        let tables = vec![app, lib];
        let files = tables.iter().map(|t| (t.path.as_str(), t)).collect();

        let global = Resolver::new(files, NamingScheme::Global);
        assert_eq!(global.resolve(&tables[0], "Engine").as_deref(), Some("Engine"));
        assert_eq!(resolver(&tables).resolve(&tables[0], "Engine"), None);
    }
}
